use clap::Parser;

use talent_eval::Args;

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
	color_eyre::install()?;

	let args = Args::parse();

	talent_eval::run(args).await
}
