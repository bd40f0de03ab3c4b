//! Device-facing traits: claim a job, report what the device said.
//!
//! Small surface, strong separation: the worker drives; the store judges.
//!
//! Why:
//! - Claiming is the only way a device sees a job; the store enforces
//!   at-most-once handout.
//! - `report` consumes the lease, so one claim yields at most one report.
//! - There is no heartbeat or expiry. An unanswered job waits until a newer
//!   job replaces it.
mod tmp {
    use crate::job::Completion;

    /// Backend marker carrying the backend-specific error type.
    pub trait BackEndDriver: Send {
        type Error: std::error::Error + Send;
    }

    /// Authority to answer one claimed job.
    #[trait_variant::make(LeaseContext: Send)]
    pub trait LocalLeaseContext {
        type Driver: BackEndDriver;

        /// Hand the device's raw reply to the store and get its verdict.
        #[allow(unused)]
        async fn report(
            self,
            raw: String,
        ) -> Result<Completion, <Self::Driver as BackEndDriver>::Error>;
    }

    /// Pair of claimed job and the lease used to answer it.
    pub struct Lease<Data, Context> {
        data: Data,
        context: Context,
    }

    impl<Data, Context> Lease<Data, Context> {
        /// Separate payload and context for handler and bookkeeping.
        pub fn split_parts(self) -> (Data, Context) {
            (self.data, self.context)
        }

        /// Build a lease from payload and context.
        pub fn from_parts(data: Data, context: Context) -> Self {
            Self { data, context }
        }
    }

    #[trait_variant::make(JobSource: Send)]
    pub trait LocalJobSource {
        type Driver: BackEndDriver;
        type Data: Send + 'static;
        type Context: LeaseContext + Send + 'static;

        /// Claim the current job if it has not been handed out yet.
        #[allow(unused)]
        async fn poll_job(
            &mut self,
        ) -> Result<Option<Lease<Self::Data, Self::Context>>, <Self::Driver as BackEndDriver>::Error>;
    }
}

pub use tmp::{BackEndDriver, JobSource, Lease, LeaseContext};
