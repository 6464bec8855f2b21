use rocket::fairing::{Fairing, Info, Kind};
use rocket::tokio;
use rocket::{Orbit, Rocket};
use std::sync::Arc;
use std::time::Duration;

use crate::delivery::DeliveryService;

/// Spawns the requeue worker and the ledger sweep once Rocket is up.
pub struct BackgroundTasks {
    pub requeue_interval: Duration,
    pub sweep_interval: Duration,
}

#[rocket::async_trait]
impl Fairing for BackgroundTasks {
    fn info(&self) -> Info {
        Info {
            name: "Background Tasks",
            kind: Kind::Liftoff,
        }
    }

    async fn on_liftoff(&self, rocket: &Rocket<Orbit>) {
        let Some(service) = rocket.state::<Arc<DeliveryService>>() else {
            log::error!("[task] DeliveryService not in managed state, background tasks not started");
            return;
        };

        // Failure queue requeue task
        let worker = service.requeue_worker();
        tokio::spawn(worker.run(self.requeue_interval));

        // Rate limit ledger sweep task
        let s = Arc::clone(service);
        let interval = self.sweep_interval;
        tokio::spawn(async move {
            loop {
                tokio::time::sleep(interval).await;
                let count = s.limiter().ledger().sweep();
                if count > 0 {
                    log::info!("[task] Swept {} idle rate limit keys", count);
                }
            }
        });

        log::info!(
            "[task] Background tasks started (requeue every {}s)",
            self.requeue_interval.as_secs()
        );
    }
}
