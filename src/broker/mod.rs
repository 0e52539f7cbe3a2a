pub mod clock;
pub mod command;
pub mod engine;
pub mod queue;

pub use clock::{Clock, ManualClock, SystemClock};
pub use command::{Command, CommandFactory, CommandId, DeviceId, NewCommand, Params};
pub use engine::{BrokerStats, CommandBroker};
pub use queue::QueueStore;
