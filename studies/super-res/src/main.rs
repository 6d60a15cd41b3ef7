use std::{ env, io };

use anyhow::{ Context, Result };
use clap::Parser;
use super_res::{
    cli::{ Cli, Commands, TrainArgs },
    config::{ InferenceConfig, TrainingConfig },
    inference,
    resolver::PromptResolver,
    train::{ prepare_datasets, run_session },
};

fn main() -> Result<()> {
    tracing_subscriber
        ::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter
                ::from_default_env()
                .add_directive("super_res=info".parse().context("invalid log directive")?)
        )
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Train(args) => train(args),
        Commands::Upscale(args) => {
            let config = InferenceConfig::from(args);
            inference::upscale(&config).context("upscaling failed")?;
            Ok(())
        }
    }
}

fn train(args: TrainArgs) -> Result<()> {
    println!("{:?}", args);
    let config = TrainingConfig::from(&args);
    config.validate().context("invalid training options")?;

    println!("\n ██████ Training and Validation Data Preparation ██████");
    let (train_set, valid_set) = match args.fixed_resolver() {
        Some(mut resolver) => prepare_datasets(&mut resolver, &config)?,
        None => {
            println!("Path input examples: dataset.zip or folder/dataset.zip");
            println!("-------------------------------------------------------\n");
            let root = env::current_dir().context("cannot read the working directory")?;
            let stdin = io::stdin();
            let mut resolver = PromptResolver::new(root, stdin.lock(), io::stdout());
            prepare_datasets(&mut resolver, &config)?
        }
    };

    println!("\n ██████ Training ██████");
    let summary = run_session(&config, train_set, valid_set).context("training failed")?;
    if let Some(last) = summary.epochs.last() {
        println!(
            "Last epoch: Average Loss {:.4} | Average PSNR {:.4} dB | {}",
            last.average_loss,
            last.average_psnr,
            last.checkpoint.weights.display()
        );
    }
    Ok(())
}
