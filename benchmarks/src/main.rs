use anyhow::anyhow;
use clap::Parser;
use const_format::concatcp;
use rand::seq::SliceRandom;
use reqwest::blocking::{Client, Response};
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::json;
use std::collections::HashMap;
use std::fs::File;
use std::process::{self, Child, Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

const LOCAL_PORT: u32 = 8374;
const LOCAL_URL: &str = concatcp!("http://127.0.0.1:", LOCAL_PORT);

#[rustfmt::skip]
const OPTIONS: &[&str] = &[
    "Alice",
    "Bob",
    "Carol",
    "Dave",
    "Eve",
    "Fred",
    "Grace",
    "Henry",
    "Irene",
    "Joe",
];

#[derive(Parser)]
struct Args {
    /// Silence local server logging.
    #[arg(short, long)]
    quiet: bool,

    /// Send local server logging to this file; takes precedence over --quiet.
    #[arg(long)]
    logfile: Option<String>,

    /// Connect to a remote server at this URL instead of running a local one.
    #[arg(long)]
    remote: Option<String>,

    /// How many threads to use. Defaults to the number of logical CPUs.
    #[arg(long, default_value_t = num_cpus::get())]
    threads: usize,

    /// Votes each thread attempts to cast.
    #[arg(long, default_value_t = 100)]
    votes_per_thread: u64,

    /// Fraction of all attempted votes the poll accepts before closing.
    /// Values below 1 exercise rejection after closure.
    #[arg(long, default_value_t = 0.9)]
    fill: f64,

    /// Also resubmit every vote, which the server must reject as a repeat.
    #[arg(long)]
    repeat: bool,
}

/// Construct a URL from a base and a path.
macro_rules! url {
    ($base:expr, $path:expr) => {{
        format!("{}/{}", $base.trim_end_matches('/'), $path)
    }};
}

/// Ensure the optimised build is up-to-date.
fn setup_deps() -> anyhow::Result<()> {
    Command::new("cargo")
        .args(["build", "--release", "--bin", "castvote-backend"])
        .status()?
        .success()
        .then_some(())
        .ok_or_else(|| anyhow!("server build exited nonzero"))
}

/// Terminate the given child process. This is a SIGTERM on unix and a hard-kill on other
/// platforms.
fn terminate_child(child: &mut Child) -> anyhow::Result<()> {
    #[cfg(unix)]
    {
        let pid = nix::unistd::Pid::from_raw(child.id() as i32);
        nix::sys::signal::kill(pid, nix::sys::signal::Signal::SIGTERM)?;
    }
    #[cfg(not(unix))]
    {
        child.kill()?;
    }
    Ok(())
}

/// Start a local server and wait until it answers.
fn launch_server(logfile: Stdio) -> anyhow::Result<Child> {
    let mut proc = Command::new("./target/release/castvote-backend")
        .env("ROCKET_PORT", LOCAL_PORT.to_string())
        .stdout(logfile)
        .spawn()?;

    let client = Client::new();
    loop {
        let resp = client
            .get(url!(LOCAL_URL, ""))
            .send()
            .and_then(Response::error_for_status);
        if resp.is_ok() {
            break;
        }

        // Check the server didn't exit.
        if let Some(retcode) = proc.try_wait()? {
            return Err(anyhow!("Server exited prematurely with code {}", retcode));
        }
        thread::sleep(Duration::from_millis(50));
    }

    Ok(proc)
}

/// Create a poll to benchmark against and return its ID.
fn setup_poll(url: &str, limit: u64) -> anyhow::Result<u64> {
    let poll = json!({
        "name": "Benchmark Poll",
        "options": OPTIONS,
        "limit": limit,
    });
    let resp = Client::new()
        .post(url!(url, "api/poll/new"))
        .json(&poll)
        .send()
        .and_then(Response::error_for_status)?;

    #[derive(Deserialize)]
    struct Pid {
        id: u64,
    }
    let Pid { id } = resp.json()?;
    Ok(id)
}

/// What happened to each attempted vote.
#[derive(Debug, Default, Clone, Copy)]
struct VoteCounts {
    accepted: u64,
    closed: u64,
    duplicate: u64,
    closers: u64,
    time: Duration,
}

impl std::ops::AddAssign for VoteCounts {
    fn add_assign(&mut self, rhs: Self) {
        self.accepted += rhs.accepted;
        self.closed += rhs.closed;
        self.duplicate += rhs.duplicate;
        self.closers += rhs.closers;
        self.time += rhs.time;
    }
}

/// Cast a single vote, recording how the server answered.
fn cast_vote(
    url: &str,
    pid: u64,
    client: &Client,
    voter: u64,
    counts: &mut VoteCounts,
) -> anyhow::Result<()> {
    let vote = json!({
        "id": voter,
        "option": OPTIONS.choose(&mut rand::thread_rng()),
    });
    let start = Instant::now();
    let resp = client
        .post(url!(url, format!("api/poll?id={pid}")))
        .json(&vote)
        .send()?;
    counts.time += start.elapsed();

    match resp.status() {
        StatusCode::OK => {
            #[derive(Deserialize)]
            struct Receipt {
                closed: bool,
            }
            let Receipt { closed } = resp.json()?;
            counts.accepted += 1;
            if closed {
                counts.closers += 1;
            }
        }
        StatusCode::FORBIDDEN => counts.closed += 1,
        StatusCode::CONFLICT => counts.duplicate += 1,
        other => return Err(anyhow!("unexpected status {other} for voter {voter}")),
    }
    Ok(())
}

/// Run the benchmark, returning the combined vote outcomes.
fn benchmark(
    url: &str,
    pid: u64,
    num_threads: usize,
    votes_per_thread: u64,
    repeat: bool,
) -> anyhow::Result<VoteCounts> {
    let end_val = num_threads as u64 * votes_per_thread;

    let start = Instant::now();
    let totals = thread::scope(|s| {
        let mut threads = Vec::with_capacity(num_threads);

        for first in (0..end_val).step_by(votes_per_thread.max(1) as usize) {
            let t = s.spawn(move || {
                let client = Client::new();
                let mut counts = VoteCounts::default();
                for voter in first..(first + votes_per_thread) {
                    cast_vote(url, pid, &client, voter, &mut counts)?;
                    if repeat {
                        cast_vote(url, pid, &client, voter, &mut counts)?;
                    }
                }
                Ok::<_, anyhow::Error>(counts)
            });
            threads.push(t);
        }

        let mut totals = VoteCounts::default();
        for t in threads {
            totals += t.join().map_err(|_| anyhow!("thread panicked"))??;
        }
        Ok::<_, anyhow::Error>(totals)
    })?;
    let total_duration = start.elapsed();

    let attempts = totals.accepted + totals.closed + totals.duplicate;
    let avg_vote = totals.time / attempts.max(1) as u32;
    println!("accepted:  {}", totals.accepted);
    println!("closed:    {}", totals.closed);
    println!("duplicate: {}", totals.duplicate);
    println!("\naverage vote: {:?}", avg_vote);
    println!(
        "actual duration: {} requests in {:?} ({:.2}/s)",
        attempts,
        total_duration,
        attempts as f64 / total_duration.as_secs_f64()
    );

    Ok(totals)
}

/// Return `Ok(())` if the poll's final state agrees with what the benchmark saw.
fn verify(url: &str, pid: u64, limit: u64, totals: &VoteCounts) -> anyhow::Result<()> {
    let client = Client::new();

    #[derive(Deserialize)]
    struct Details {
        count: u64,
        closed: bool,
    }
    let details: Details = client
        .get(url!(url, format!("api/poll?id={pid}")))
        .send()
        .and_then(Response::error_for_status)?
        .json()?;

    #[derive(Deserialize)]
    struct Live {
        livedata: HashMap<String, u64>,
    }
    let live: Live = client
        .get(url!(url, format!("api/poll/livedata?id={pid}")))
        .send()
        .and_then(Response::error_for_status)?
        .json()?;
    let sum: u64 = live.livedata.values().sum();

    if sum != details.count {
        return Err(anyhow!("tally sum {sum} disagrees with vote count {}", details.count));
    }
    if details.count > limit {
        return Err(anyhow!("poll accepted {} votes past its limit of {limit}", details.count));
    }
    if details.count != totals.accepted {
        return Err(anyhow!(
            "server counted {} votes but accepted {}",
            details.count,
            totals.accepted
        ));
    }
    if details.count == limit && (!details.closed || totals.closers != 1) {
        return Err(anyhow!(
            "poll reached its limit but closed={} with {} closing votes",
            details.closed,
            totals.closers
        ));
    }

    println!("verified: {} votes, closed={}", details.count, details.closed);
    Ok(())
}

fn run() -> anyhow::Result<()> {
    let args = Args::parse();
    let url = args.remote.as_deref().unwrap_or(LOCAL_URL);

    // If we're not connecting remotely, bring up a local server.
    let mut proc: Option<Child> = None;
    if args.remote.is_none() {
        setup_deps()?;
        let logfile = match args.logfile {
            Some(path) => Stdio::from(File::create(path)?),
            None => {
                if args.quiet {
                    Stdio::null()
                } else {
                    Stdio::inherit()
                }
            }
        };
        proc = Some(launch_server(logfile)?);
    }

    // Use a closure to ensure the cleanup below runs.
    let result = (|| {
        let attempts = args.threads as u64 * args.votes_per_thread;
        let limit = ((attempts as f64 * args.fill).round() as u64).max(1);
        let pid = setup_poll(url, limit)?;
        let totals = benchmark(url, pid, args.threads, args.votes_per_thread, args.repeat)?;
        verify(url, pid, limit, &totals)
    })();

    // Kill the server.
    if let Some(p) = proc.as_mut() {
        terminate_child(p)?;
        p.wait()?;
    }

    result
}

fn main() {
    if let Err(e) = run() {
        eprintln!("FATAL: {}", e);
        process::exit(1);
    }
}
