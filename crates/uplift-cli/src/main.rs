use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, CommandFactory, Parser, Subcommand, ValueEnum};

mod command_flows;
mod render;

use command_flows::{run_doctor_command, run_upgrade_command, UpgradeOptions};
use render::{output_style, render_final_line};

#[derive(Parser, Debug)]
#[command(name = "uplift")]
#[command(about = "In-place connector package upgrades for platform instances", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    Upgrade(UpgradeArgs),
    Doctor {
        #[arg(long)]
        instance: PathBuf,
        #[arg(long)]
        plain: bool,
    },
    Completions { shell: clap_complete::Shell },
}

#[derive(Args, Debug)]
struct UpgradeArgs {
    #[arg(short = 'z', long)]
    package: String,

    #[arg(short = 'l', long)]
    log: PathBuf,

    #[arg(short = 's', long)]
    instance: PathBuf,

    #[arg(short = 'u', long)]
    admin: String,

    #[arg(short = 't', long)]
    template: Option<PathBuf>,

    #[arg(long, value_enum, default_value_t = DeploymentModeArg::Direct)]
    mode: DeploymentModeArg,

    #[arg(long)]
    key: String,

    #[arg(long)]
    provider: Option<String>,

    #[arg(long)]
    plain: bool,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum DeploymentModeArg {
    Direct,
    Templated,
}

fn run_cli(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Upgrade(args) => {
            let style = output_style(args.plain);
            let options = UpgradeOptions {
                package: args.package,
                log_path: args.log,
                instance: args.instance,
                admin: args.admin,
                template: args.template,
                templated: args.mode == DeploymentModeArg::Templated,
                key: args.key,
                provider: args.provider,
                output_style: style,
            };
            run_upgrade_command(&options)?;
            println!("{}", render_final_line(style, "Success!"));
        }
        Commands::Doctor { instance, plain } => {
            run_doctor_command(&instance, output_style(plain))?;
        }
        Commands::Completions { shell } => {
            let mut command = Cli::command();
            clap_complete::generate(shell, &mut command, "uplift", &mut std::io::stdout());
        }
    }

    Ok(())
}

fn main() {
    let cli = Cli::parse();
    if let Err(err) = run_cli(cli) {
        eprintln!("{err:#}");
        std::process::exit(1);
    }
}
