//! Phone Pilot - observe-decide-act automation for Android
//!
//! Usage: phone-pilot [--resume] [--clear] [goal...]

use std::env;
use std::io::{self, BufRead, Write};
use std::sync::Arc;

use anyhow::Context;
use phone_pilot::adb::{AdbConnection, AdbDevice};
use phone_pilot::config::{get_messages, Messages};
use phone_pilot::{
    AgentEvent, AgentLoop, AgentState, AppSettings, DecisionEngine, EngineKind, FileStore,
    ModelClient, ModelDecisionEngine, RuleBasedEngine, TaskStatus,
};
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

struct Args {
    resume: bool,
    clear: bool,
    goal: Option<String>,
}

fn parse_args() -> Args {
    let mut resume = false;
    let mut clear = false;
    let mut words = Vec::new();

    for arg in env::args().skip(1) {
        match arg.as_str() {
            "--resume" => resume = true,
            "--clear" => clear = true,
            _ => words.push(arg),
        }
    }

    let goal = Some(words.join(" ")).filter(|g| !g.trim().is_empty());
    Args {
        resume,
        clear,
        goal,
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present (ignore errors if file doesn't exist)
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = parse_args();
    let mut settings = AppSettings::load();
    settings.apply_env();
    let msgs = get_messages(&settings.lang);

    let mut conn = AdbConnection::new().with_path(&settings.adb_path);
    if !settings.device_id.is_empty() {
        conn = conn.with_device_id(&settings.device_id);
    }
    match conn.list_devices().await {
        Ok(devices) if !devices.is_empty() => {}
        Ok(_) => eprintln!("⚠️  {}: no devices attached", msgs.connection_failed),
        Err(e) => eprintln!("⚠️  {}: {}", msgs.connection_failed, e),
    }
    let device = Arc::new(AdbDevice::new(conn));

    let engine: Box<dyn DecisionEngine> = match settings.engine {
        EngineKind::Rules => Box::new(RuleBasedEngine::new()),
        EngineKind::Model => Box::new(ModelDecisionEngine::new(
            ModelClient::new(settings.to_model_config()),
            settings.lang.clone(),
        )),
    };

    let store_dir = settings
        .task_store_dir()
        .context("Cannot determine task store directory")?;

    println!("🤖 Phone Pilot");
    println!("================================================");
    println!("Engine: {:?}", settings.engine);
    if settings.engine == EngineKind::Model {
        println!("Model: {} @ {}", settings.model_name, settings.base_url);
    }
    println!("Language: {}", settings.lang);
    println!("Task store: {}", store_dir.display());
    println!("================================================\n");

    let (event_tx, mut event_rx) = mpsc::unbounded_channel();
    let mut agent = AgentLoop::new(
        device.clone(),
        device,
        engine,
        Box::new(FileStore::new(store_dir)),
        settings.to_agent_config(),
    )
    .with_executor_config(settings.to_executor_config())
    .with_event_sender(event_tx);

    // Ctrl-C pauses the running task
    let signal = agent.stop_signal();
    tokio::spawn(async move {
        while tokio::signal::ctrl_c().await.is_ok() {
            signal.stop();
        }
    });

    if args.clear {
        agent.clear();
        println!("🧹 {}", msgs.task_cleared);
    }

    if args.resume {
        let goal = match agent.restore() {
            Some(task) if task.status == TaskStatus::Paused => Some(task.goal.clone()),
            _ => None,
        };
        match goal {
            Some(goal) => {
                println!("▶️  {}: {}\n", msgs.resuming_task, goal);
                agent.resume()?;
                agent.run_to_end().await;
                report(&agent, &mut event_rx, msgs);
            }
            None => println!("{}", msgs.no_saved_task),
        }
        return Ok(());
    }

    if let Some(goal) = args.goal {
        run_goal(&mut agent, &mut event_rx, msgs, &goal).await;
        return Ok(());
    }
    if args.clear {
        return Ok(());
    }

    // Interactive mode
    let stdin = io::stdin();
    loop {
        print!("📝 {}: ", msgs.enter_goal);
        io::stdout().flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        let goal = line.trim();
        if goal.is_empty() {
            break;
        }

        run_goal(&mut agent, &mut event_rx, msgs, goal).await;
    }

    Ok(())
}

async fn run_goal(
    agent: &mut AgentLoop,
    events: &mut mpsc::UnboundedReceiver<AgentEvent>,
    msgs: &Messages,
    goal: &str,
) {
    println!("📝 {}: {}\n", msgs.starting_task, goal);
    match agent.run(goal).await {
        Ok(_) => report(agent, events, msgs),
        Err(e) => eprintln!("❌ {}", e),
    }
}

fn report(agent: &AgentLoop, events: &mut mpsc::UnboundedReceiver<AgentEvent>, msgs: &Messages) {
    while let Ok(event) = events.try_recv() {
        if let AgentEvent::Error { message } = event {
            eprintln!("⚠️  {}", message);
        }
    }

    let headline = match agent.state() {
        AgentState::Completed => format!("✅ {}", msgs.task_completed),
        AgentState::Failed => format!("❌ {}", msgs.task_failed),
        AgentState::Paused => format!("⏸️  {}", msgs.task_paused),
        other => format!("{:?}", other),
    };
    println!("\n{}", headline);

    if let Some(stats) = agent.performance_stats() {
        println!(
            "{}: {} ({} ✓ / {} ✗)",
            msgs.steps, stats.total_steps, stats.successful_steps, stats.failed_steps
        );
        println!("{}: {:.0}%", msgs.success_rate, stats.success_rate * 100.0);
        println!("{}: {:.1}s\n", msgs.duration, stats.duration.as_secs_f64());
    }
}
