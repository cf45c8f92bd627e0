use anyhow::{Context, Result};
use notegrab_collect::{CollectOptions, Collector, write_notes};
use notegrab_config::{AuthStyle, NotegrabConfig};
use notegrab_markov::{MarkovData, Simulator, Trainer, load_note_texts};
use notegrab_social::misskey::{MisskeyApi, TokenPlacement};
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::path::PathBuf;
use std::time::Duration;

fn token_placement(style: AuthStyle) -> TokenPlacement {
    match style {
        AuthStyle::Body => TokenPlacement::Body,
        AuthStyle::Bearer => TokenPlacement::Bearer,
    }
}

pub async fn collect(
    cfg: &NotegrabConfig,
    username: Option<&str>,
    output: Option<PathBuf>,
) -> Result<()> {
    let username = username.unwrap_or(&cfg.username);
    let output = output.unwrap_or_else(|| cfg.collect.output.clone());

    let api = MisskeyApi::with_origin(&cfg.origin(), &cfg.instance_host, cfg.api_key.clone())?
        .with_timeout(Duration::from_secs(cfg.collect.request_timeout_secs))
        .with_token_placement(token_placement(cfg.collect.auth_style));
    let collector = Collector::new(
        api,
        CollectOptions {
            page_size: cfg.collect.page_size,
            page_delay: Duration::from_millis(cfg.collect.page_delay_ms),
            local_only: cfg.collect.local_only,
        },
    );

    let notes = collector
        .collect_all(username)
        .await
        .with_context(|| format!("collecting notes of @{username}@{}", cfg.instance_host))?;
    write_notes(&output, &notes).with_context(|| format!("writing {}", output.display()))
}

pub fn train(cfg: &NotegrabConfig, input: Option<PathBuf>, output: Option<PathBuf>) -> Result<()> {
    let input = input.unwrap_or_else(|| cfg.markov.notes.clone());
    let output = output.unwrap_or_else(|| cfg.markov.model.clone());

    let texts =
        load_note_texts(&input).with_context(|| format!("reading notes from {}", input.display()))?;
    let mut trainer = Trainer::new()?;
    for text in &texts {
        trainer.feed(text)?;
    }
    trainer
        .finish()
        .save(&output)
        .with_context(|| format!("writing model to {}", output.display()))?;

    tracing::info!(notes = texts.len(), output = %output.display(), "train.done");
    Ok(())
}

pub fn simulate(
    cfg: &NotegrabConfig,
    model: Option<PathBuf>,
    depth: Option<usize>,
    seed: Option<u64>,
) -> Result<()> {
    let model = model.unwrap_or_else(|| cfg.markov.model.clone());
    let data = MarkovData::load(&model)
        .with_context(|| format!("reading model from {}", model.display()))?;
    let simulator = Simulator::new(data);

    let mut rng = match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let note = simulator.generate(depth.unwrap_or(cfg.markov.max_depth), &mut rng);
    println!("{note}");
    Ok(())
}
