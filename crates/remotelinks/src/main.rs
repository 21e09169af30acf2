use clap::Parser;

fn main() -> anyhow::Result<()> {
    let cli = remotelinks::ui::cli::Cli::parse();
    remotelinks::init(cli.verbose);

    remotelinks::ui::app::UiApp::new(cli).run()
}
