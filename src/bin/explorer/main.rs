use anyhow::Result;
use clap::Parser;
use dotenvy::dotenv;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;
use web_explorer::config::ExplorerArgs;
use web_explorer::{Environment, WebExplorationEnvironment};

fn main() -> Result<()> {
    dotenv().ok();
    let args = ExplorerArgs::parse();

    let level = if args.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = args.resolve()?;
    let mut env = WebExplorationEnvironment::new(config)?;
    info!(url = env.target_url(), episodes = args.episodes, "environment ready");

    let outcome = run(&mut env, &args);
    env.close()?;
    outcome
}

fn run(env: &mut WebExplorationEnvironment, args: &ExplorerArgs) -> Result<()> {
    for episode in 1..=args.episodes {
        let seed = args.seed.map(|s| s.wrapping_add(episode as u64));
        let total = run_episode(env, args.max_steps, seed)?;
        info!(episode, total_reward = total, "episode finished");
    }
    Ok(())
}

/// Random-policy rollout; returns the episode's summed reward.
fn run_episode(
    env: &mut WebExplorationEnvironment,
    max_steps: usize,
    seed: Option<u64>,
) -> Result<i64> {
    let (observation, reset_info) = env.reset(seed)?;
    info!(url = %reset_info.url, ?observation, "episode started");

    let mut total = 0;
    for step in 1..=max_steps {
        let action = env.action_space().sample();
        let transition = env.step(action)?;
        total += transition.reward;
        debug!(
            step,
            action,
            reward = transition.reward,
            selection = ?transition.info.selection,
            observation = ?transition.observation,
            "step"
        );

        if transition.is_done() {
            info!(
                step,
                reason = transition.info.truncated.as_deref().unwrap_or("terminated"),
                "episode ended"
            );
            break;
        }
    }
    Ok(total)
}
