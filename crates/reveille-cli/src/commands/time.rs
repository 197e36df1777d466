use clap::Subcommand;
use reveille_core::{SimpleTime, SystemClock};

#[derive(Subcommand)]
pub enum TimeAction {
    /// Show a reference-zone alarm time in local terms
    Show {
        /// Alarm time as "HH:MM" in the reference zone
        time: String,
    },
    /// Countdown to the next local occurrence
    Next {
        /// Alarm time as "HH:MM" in the reference zone
        time: String,
    },
}

pub fn run(action: TimeAction) -> Result<(), Box<dyn std::error::Error>> {
    let clock = SystemClock;
    match action {
        TimeAction::Show { time } => {
            let t = SimpleTime::parse(&time);
            let (local, ampm) = t.local_parts(&clock);
            println!("reference : {t} ({} {})", t.hour12(), t.ampm_suffix());
            println!(
                "local     : {local} {ampm} (offset {})",
                SimpleTime::local_offset_text(&clock)
            );
            println!("next ring : {}", t.next_local_occurrence(&clock).to_rfc3339());
        }
        TimeAction::Next { time } => {
            println!("{}", SimpleTime::parse(&time).countdown_text(&clock));
        }
    }
    Ok(())
}
