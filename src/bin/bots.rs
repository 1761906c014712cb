use std::sync::Arc;

use clap::Parser;

use phrasecast::bot::{Bot, BotOutcome, BotSettings, ChatGenerator, LexiconGenerator, TextGenerator};
use phrasecast::config::{init_logging, BotConfig, GeneratorKind};
use phrasecast::words::Lexicon;

fn generator(config: &BotConfig) -> anyhow::Result<Arc<dyn TextGenerator>> {
    Ok(match config.generator {
        GeneratorKind::Lexicon => {
            let lexicon = Lexicon::load(&config.wordlist, &config.targets)?;
            Arc::new(LexiconGenerator::new(&lexicon, config.seed))
        }
        GeneratorKind::Chat => {
            if config.api_key.is_none() {
                log::warn!("no API key set for {}", config.chat_url);
            }
            Arc::new(ChatGenerator::new(
                config.chat_url.clone(),
                config.chat_model.clone(),
                config.api_key.clone(),
                config.chat_timeout(),
            ))
        }
    })
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = BotConfig::parse();
    init_logging();

    let generator = generator(&config)?;
    let settings = BotSettings {
        max_retries: config.max_retries,
        retry_delay: config.retry_delay(),
    };

    let mut handles = Vec::with_capacity(config.num_players);
    for i in 0..config.num_players {
        let name = format!("AI_Player_{}", i + 1);
        let mut bot = Bot::new(name.clone(), config.game_code.clone(), generator.clone(), settings);
        if let Some(seed) = config.seed {
            bot = bot.with_seed(seed.wrapping_add(i as u64));
        }
        let server = config.server.clone();
        handles.push(tokio::spawn(async move { (name, bot.run(&server).await) }));
    }

    for handle in handles {
        match handle.await? {
            (name, Ok(BotOutcome::Finished { winner })) => log::info!("{}: finished, {} won", name, winner),
            (name, Ok(BotOutcome::GaveUp { reason })) => log::warn!("{}: gave up: {}", name, reason),
            (name, Err(e)) => log::error!("{}: {:#}", name, e),
        }
    }
    Ok(())
}
