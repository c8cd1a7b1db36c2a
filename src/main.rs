use rand::prelude::*;
use schedsim::{run_batch, BatchResult, Occupant, Policy, ProcessSpec};
use simplelog::{ColorChoice, Config, LevelFilter, TermLogger, TerminalMode};

fn main() {
    TermLogger::init(
        LevelFilter::Info,
        Config::default(),
        TerminalMode::Stderr,
        ColorChoice::Auto,
    )
    .expect("logger init");

    let specs = bernoulli_workload(30, 0.25, 8, 0);
    println!("workload: {} processes", specs.len());

    let policies = [
        Policy::Fcfs,
        Policy::Sjf,
        Policy::Srtf,
        Policy::Priority,
        Policy::PriorityPreemptive,
        Policy::RoundRobin { quantum: 2 },
        Policy::MultilevelQueue { quantum: 2 },
        Policy::MultilevelFeedback { quantum: 2 },
    ];

    for policy in policies {
        let result = run_batch(&specs, policy).expect("generated workload is valid");
        print_result(policy, &result);
    }
}

fn print_result(policy: Policy, result: &BatchResult) {
    println!("\n== {policy} ==");
    let gantt: Vec<String> = result
        .timeline
        .iter()
        .map(|block| {
            let who = match block.occupant {
                Occupant::Idle => "idle".to_string(),
                Occupant::Proc { id } => result.stats[id].label.clone(),
            };
            format!("{who}[{},{})", block.start, block.end)
        })
        .collect();
    println!("  {}", gantt.join(" "));
    println!(
        "  avg waiting {:.2}  avg turnaround {:.2}",
        result.averages.waiting_time, result.averages.turnaround_time
    );
}

/// Bernoulli arrivals: each tick spawns a process with probability
/// `p_arrival`, with a burst uniform in 1..=max_burst. Priorities and MLQ
/// levels are drawn at random so every policy has something to chew on.
fn bernoulli_workload(ticks: u64, p_arrival: f64, max_burst: u64, seed: u64) -> Vec<ProcessSpec> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut specs = Vec::new();

    for t in 0..ticks {
        if rng.random::<f64>() < p_arrival {
            specs.push(ProcessSpec {
                id: 1000 + specs.len() as u64,
                arrival_time: t,
                burst_time: rng.random_range(1..=max_burst),
                priority: Some(rng.random_range(0..5)),
                queue_level: Some(rng.random_range(1..=3)),
            });
        }
    }

    specs
}
