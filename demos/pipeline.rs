//! # Example: Supervised pipeline
//!
//! A periodic `ticker` (graceful shutdown through a hurriable timer, call/cast
//! enabled) and a `flaky` stage that fails twice before settling down, under
//! `RestForOne`: every flaky failure also restarts the `sink` registered after it.
//!
//! Run with `RUST_LOG=debug cargo run --example pipeline`, stop with Ctrl-C.

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;
use ultravisor::{
    ChildContext, ChildSpec, HurriableTimer, LogWriter, RestartPolicy, Strategy, Subscribe,
    Supervisor, SupervisorConfig, Worker, WorkerError,
};

struct Ticker {
    period: Duration,
    ticks: AtomicU64,
    stopping: AtomicBool,
    timer: Mutex<HurriableTimer>,
}

impl Ticker {
    fn new(period: Duration) -> Self {
        Self {
            period,
            ticks: AtomicU64::new(0),
            stopping: AtomicBool::new(false),
            timer: Mutex::new(HurriableTimer::new(Duration::ZERO)),
        }
    }

    fn stop(&self) {
        self.stopping.store(true, Ordering::SeqCst);
        if let Ok(timer) = self.timer.lock() {
            timer.hurry();
        }
    }
}

#[async_trait]
impl Worker for Ticker {
    type Output = u64;

    async fn run(self: Arc<Self>, mut ctx: ChildContext<Self>) -> Result<u64, WorkerError> {
        let tag = format!("{}#{}", ctx.id(), ctx.generation());
        loop {
            let timer = HurriableTimer::new(self.period);
            if let Ok(mut slot) = self.timer.lock() {
                *slot = timer.clone();
            }
            if self.stopping.load(Ordering::SeqCst) {
                break;
            }
            tokio::select! {
                _ = timer.wait() => {
                    let n = self.ticks.fetch_add(1, Ordering::Relaxed) + 1;
                    println!("[{tag}] tick {n}");
                }
                Some(envelope) = ctx.inbox().recv() => envelope.go(&self),
            }
        }
        Ok(self.ticks.load(Ordering::Relaxed))
    }
}

fn flaky() -> ChildSpec<impl Worker> {
    let attempts = Arc::new(AtomicUsize::new(0));
    ChildSpec::from_fn("flaky", move |stop: CancellationToken| {
        let attempt = attempts.fetch_add(1, Ordering::SeqCst) + 1;
        async move {
            tokio::time::sleep(Duration::from_millis(300)).await;
            if attempt <= 2 {
                return Err(WorkerError::fail(format!("attempt {attempt} lost its connection")));
            }
            println!("[flaky] attempt {attempt} is stable");
            stop.cancelled().await;
            Ok(())
        }
    })
    .with_policy(RestartPolicy::new(
        Duration::from_secs(10),
        5,
        Duration::from_millis(100)..Duration::from_millis(400),
    ))
}

fn sink() -> ChildSpec<impl Worker> {
    ChildSpec::from_fn("sink", |stop: CancellationToken| async move {
        println!("[sink] ready");
        stop.cancelled().await;
        println!("[sink] drained");
        Ok::<(), WorkerError>(())
    })
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cfg = SupervisorConfig {
        strategy: Strategy::RestForOne,
        ..SupervisorConfig::default()
    };
    let ticker = ChildSpec::new("ticker", || Ticker::new(Duration::from_millis(500)))
        .with_castcall(true)
        .with_shutdown_method(Ticker::stop);

    let subs: Vec<Arc<dyn Subscribe>> = vec![Arc::new(LogWriter::new())];
    let sup = Supervisor::builder(cfg)
        .with_child(ticker)?
        .with_child(flaky())?
        .with_child(sink())?
        .with_subscribers(subs)
        .build();

    let inspector = {
        let sup = Arc::clone(&sup);
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(2)).await;
            let Some(ticker) = sup.child::<Ticker>("ticker").await else {
                return;
            };
            match ticker.call(|t: &Ticker| t.ticks.load(Ordering::Relaxed)).await {
                Ok(ticks) => println!("[inspector] ticker has ticked {ticks} times"),
                Err(err) => println!("[inspector] call failed: {err}"),
            }
            let _ = ticker.cast(|_: &Ticker| {
                println!("[inspector] cast ran on {:?}", std::thread::current().name());
            });
        })
    };

    sup.run_until_signal().await?;
    inspector.abort();

    if let Some(ticker) = sup.child::<Ticker>("ticker").await {
        println!("ticker finished after {:?} ticks", ticker.termination_value().await);
    }
    Ok(())
}
