use std::sync::Arc;

use clap::Subcommand;
use reveille_core::alarm::ops;
use reveille_core::store::memory::MemoryStore;
use reveille_core::{ReconcileEngine, SimpleTime, SystemClock};
use tokio::time::{sleep, Duration};

#[derive(Subcommand)]
pub enum SimulateAction {
    /// Drive one full wake cycle for a simulated group and print every
    /// device's event stream
    Cycle {
        /// Comma-separated member identifiers
        #[arg(long, default_value = "a@sim,b@sim,c@sim")]
        members: String,
        /// Alarm time as "HH:MM" in the reference zone
        #[arg(long, default_value = "07:00")]
        time: String,
        /// Group identifier
        #[arg(long, default_value = "sim")]
        group: String,
    },
}

pub fn run(action: SimulateAction) -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();
    let rt = tokio::runtime::Runtime::new()?;
    match action {
        SimulateAction::Cycle {
            members,
            time,
            group,
        } => {
            let members: Vec<String> = members
                .split(',')
                .map(|m| m.trim().to_string())
                .filter(|m| !m.is_empty())
                .collect();
            if members.is_empty() {
                return Err("at least one member required".into());
            }
            rt.block_on(cycle(group, members, SimpleTime::parse(&time)))
        }
    }
}

async fn cycle(
    group: String,
    members: Vec<String>,
    time: SimpleTime,
) -> Result<(), Box<dyn std::error::Error>> {
    let store = Arc::new(MemoryStore::new());
    ops::create(store.as_ref(), &group, &members[0])?;
    for member in &members[1..] {
        ops::join(store.as_ref(), &group, member)?;
    }
    ops::update_time(store.as_ref(), &group, time)?;

    let mut devices = Vec::new();
    let mut printers = Vec::new();
    for member in &members {
        let (device, mut events) = ReconcileEngine::spawn(store.clone(), SystemClock, member);
        device.connect(Some(&group));
        let tag = member.clone();
        printers.push(tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                println!("[{tag}] {event:?}");
            }
        }));
        devices.push(device);
    }
    sleep(Duration::from_millis(50)).await;

    // Morning comes: every trigger fires.
    println!("-- trigger fires --");
    for device in &devices {
        device.trigger_now();
    }
    sleep(Duration::from_millis(50)).await;

    // Members check in one by one; the last one completes the set.
    for (device, member) in devices.iter().zip(&members) {
        println!("-- {member} acknowledges --");
        device.acknowledge().await?;
        sleep(Duration::from_millis(100)).await;
    }

    sleep(Duration::from_millis(200)).await;
    for device in &devices {
        device.shutdown();
    }
    for printer in printers {
        let _ = printer.await;
    }
    Ok(())
}
