pub mod analysis;
pub mod buffer;
pub mod config;
pub mod distance;
pub mod events;
pub mod mutation;
pub mod orchestrator;
pub mod payload;
pub mod population;
pub mod report;
pub mod sender;
pub mod token;

pub use buffer::{BufferedPacket, CrashCorrelationBuffer, CrashRecord};
pub use config::StrafeConfig;
pub use distance::{edit_distance, edit_distance_bytes};
pub use events::{CrashEvent, CrashEventSource, EventFeedError};
pub use mutation::{FieldMutator, MutationKind, Mutator};
pub use orchestrator::Orchestrator;
pub use payload::{FieldLine, Payload};
pub use population::{FitnessReport, PopulationManager};
pub use report::CrashReportWriter;
pub use sender::{PacketSender, SendError, TcpPacketSender};
pub use token::{TokenError, TokenGenerator};

mod tests {
    #[test]
    fn it_works() {
        let result = 2 + 2;
        assert_eq!(result, 4);
    }
}
