use std::time::Duration;

use aesbridge::{
    Bridge, DeviceResponse, Direction, Job, JobData, JobState, RoundtripSnapshot, RoundtripStatus,
    TokioSpawner, WorkerBuilder, WorkerContext, reference, text::ascii_to_block,
};

const KEY: &str = "2B7E151628AED2A6ABF7158809CF4F3C";

#[derive(Debug, Clone, Copy)]
enum Device {
    Faithful,
    /// Flips one ciphertext bit on the encrypt path.
    Glitchy,
    Silent,
}

async fn device(JobData(job): JobData<Job>, WorkerContext(device): WorkerContext<Device>) -> DeviceResponse {
    let Ok(mut output) = reference::transform(job.direction(), &job.key, &job.block) else {
        return DeviceResponse::Silent;
    };
    match (device, job.direction()) {
        (Device::Silent, _) => return DeviceResponse::Silent,
        (Device::Glitchy, Direction::Encrypt) => output[15] ^= 0x01,
        _ => {}
    }
    let field = match job.direction() {
        Direction::Encrypt => "ct",
        Direction::Decrypt => "pt",
    };
    DeviceResponse::Report(format!(r#"{{"status":"ok","{field}":"{}"}}"#, hex::encode(output)))
}

struct Harness {
    bridge: Bridge,
    shutdown: Vec<tokio::sync::oneshot::Sender<()>>,
    workers: tokio::task::JoinSet<()>,
}

impl Harness {
    fn start(device_kind: Device) -> Self {
        let bridge = Bridge::default();
        let mut shutdown = Vec::new();
        let mut workers = tokio::task::JoinSet::new();
        for lane in [bridge.encrypt(), bridge.decrypt()] {
            let (tx, rx) = tokio::sync::oneshot::channel::<()>();
            let worker = WorkerBuilder::new(Duration::from_millis(5))
                .context(device_kind)
                .handler(device)
                .job_spawner(TokioSpawner)
                .build(lane)
                .with_graceful_shutdown(async move {
                    let _ = rx.await;
                });
            workers.spawn(worker.run());
            shutdown.push(tx);
        }
        Self {
            bridge,
            shutdown,
            workers,
        }
    }

    async fn wait_for(&self, group_id: aesbridge::GroupId, status: RoundtripStatus) -> RoundtripSnapshot {
        tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                let snapshot = self.bridge.roundtrip_status(group_id).unwrap();
                if snapshot.status == status {
                    return snapshot;
                }
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("roundtrip did not reach expected status")
    }

    async fn stop(self) {
        for tx in self.shutdown {
            let _ = tx.send(());
        }
        self.workers.join_all().await;
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn faithful_device_completes_roundtrip() {
    let harness = Harness::start(Device::Faithful);
    let block = ascii_to_block("attack at dawn").unwrap();
    let ticket = harness
        .bridge
        .start_roundtrip(hex::decode(KEY).unwrap(), block, "7");

    let snapshot = harness.wait_for(ticket.group_id, RoundtripStatus::Done).await;
    assert!(snapshot.roundtrip_ok);
    assert!(snapshot.enc.as_ref().unwrap().valid);
    assert!(snapshot.dec.as_ref().unwrap().valid);
    assert_eq!(snapshot.pt_ascii, "attack at dawn");
    assert_eq!(snapshot.tag, "7");

    let json = serde_json::to_value(&snapshot).unwrap();
    assert_eq!(json["status"], "done");
    assert_eq!(json["timing"]["blocks"], 1);
    harness.stop().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn glitchy_device_fails_roundtrip() {
    let harness = Harness::start(Device::Glitchy);
    let block = ascii_to_block("attack at dawn").unwrap();
    let ticket = harness
        .bridge
        .start_roundtrip(hex::decode(KEY).unwrap(), block, "0");

    let snapshot = harness.wait_for(ticket.group_id, RoundtripStatus::Done).await;
    let enc = snapshot.enc.as_ref().unwrap();
    assert!(!enc.valid);
    assert_ne!(Some(&enc.output), enc.expected.as_ref());
    // Decrypting the corrupted ciphertext is itself correct.
    assert!(snapshot.dec.as_ref().unwrap().valid);
    assert!(!snapshot.roundtrip_ok);
    assert_ne!(snapshot.pt_ascii, "attack at dawn");
    harness.stop().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn silent_device_leaves_job_assigned() {
    let harness = Harness::start(Device::Silent);
    let block = ascii_to_block("hello").unwrap();
    let ticket = harness
        .bridge
        .start_roundtrip(hex::decode(KEY).unwrap(), block, "0");

    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            let state = harness.bridge.encrypt().status_of(ticket.enc_job_id).unwrap().state;
            if state == JobState::Assigned {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("job was never claimed");
    tokio::time::sleep(Duration::from_millis(50)).await;

    let snapshot = harness.bridge.roundtrip_status(ticket.group_id).unwrap();
    assert_eq!(snapshot.status, RoundtripStatus::WaitingEnc);
    assert_eq!(
        harness.bridge.encrypt().status_of(ticket.enc_job_id).unwrap().state,
        JobState::Assigned
    );
    assert!(harness.bridge.decrypt().claim_for_worker().is_none());
    harness.stop().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn standalone_decrypt_job_is_judged() {
    let harness = Harness::start(Device::Faithful);
    let key = hex::decode(KEY).unwrap();
    let ct = reference::encrypt_block(&key, &ascii_to_block("standalone").unwrap()).unwrap();
    let job = harness.bridge.decrypt().create_job(key, ct.to_vec(), "0");

    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            let snapshot = harness.bridge.decrypt().status_of(job.id).unwrap();
            if snapshot.state == JobState::Done {
                assert_eq!(snapshot.valid, Some(true));
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("decrypt job was never completed");
    harness.stop().await;
}
