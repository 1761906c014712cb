use clap::Parser;

use phrasecast::config::{init_logging, ServerConfig};
use phrasecast::dealer::RandomDealer;
use phrasecast::router::EventRouter;
use phrasecast::server::Server;
use phrasecast::state::{CodeGenerator, SessionRegistry};
use phrasecast::words::Lexicon;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ServerConfig::parse();
    init_logging();

    let lexicon = Lexicon::load(&config.wordlist, &config.targets)?;
    let registry = SessionRegistry::with_codes(CodeGenerator::new(config.code_digits));
    let router = EventRouter::with_parts(registry, lexicon, RandomDealer::default());

    let listener = Server::bind(&config.bind).await?;
    Server::new(router).run(listener).await
}
