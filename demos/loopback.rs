//! Software stand-in for the FPGA: both lanes are served by the reference
//! cipher, with an occasional flipped bit.
//!
//! Run with `cargo run --example loopback [config.json]`.
use aesbridge::{
    Bridge, BridgeConfig, DeviceResponse, Direction, Job, JobData, TokioSpawner, WorkerBuilder,
    WorkerContext, request::BlockRequest,
};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .compact()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    let config = match std::env::args().nth(1) {
        Some(path) => BridgeConfig::load_from_file(path).unwrap(),
        None => BridgeConfig::default(),
    };
    let bridge = Bridge::new(config).unwrap();

    let mut tasks = tokio::task::JoinSet::new();
    for lane in [bridge.encrypt(), bridge.decrypt()] {
        let worker = WorkerBuilder::new(std::time::Duration::from_millis(100))
            .context(5u64)
            .handler(device)
            .job_spawner(TokioSpawner)
            .build(lane);
        tasks.spawn(worker.run());
    }

    let submitter = async move {
        let messages = ["hello fpga", "attack at dawn", "0123456789abcdef"];
        let mut interval = tokio::time::interval(std::time::Duration::from_secs(1));
        let mut previous = None;
        for n in 0.. {
            interval.tick().await;
            if let Some(group_id) = previous {
                match bridge.roundtrip_status(group_id) {
                    Some(snapshot) => tracing::info!(
                        "{group_id}: {:?} ok={} pt={:?} ({})",
                        snapshot.status,
                        snapshot.roundtrip_ok,
                        snapshot.pt_ascii,
                        snapshot.timing
                    ),
                    None => tracing::warn!("{group_id} was superseded"),
                }
            }

            let text = messages[n % messages.len()];
            match BlockRequest::from_ascii("2B7E151628AED2A6ABF7158809CF4F3C", text, None) {
                Ok(request) => {
                    let ticket = bridge.start_roundtrip_request(request);
                    tracing::info!("Started {} for {text:?}", ticket.group_id);
                    previous = Some(ticket.group_id);
                }
                Err(error) => tracing::error!(error = %error, "Rejected request"),
            }
        }
    };
    tasks.spawn(submitter);

    tasks.join_all().await;
}

/// Answer with the reference output, corrupting every `glitch_every`-th job.
async fn device(JobData(job): JobData<Job>, WorkerContext(glitch_every): WorkerContext<u64>) -> DeviceResponse {
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    let Ok(mut output) = aesbridge::reference::transform(job.direction(), &job.key, &job.block) else {
        return DeviceResponse::Silent;
    };
    if job.id.seq() % glitch_every == 0 {
        output[0] ^= 0x80;
    }
    let field = match job.direction() {
        Direction::Encrypt => "ct",
        Direction::Decrypt => "pt",
    };
    DeviceResponse::Report(format!(r#"{{"{field}":"{}"}}"#, hex::encode(output)))
}
