// Command dispatch: registry, cooldowns, and the shared execution pipeline
pub mod cooldown;
pub mod invocation;
pub mod pipeline;
pub mod registry;
pub mod surface;

pub use cooldown::{RateLimiter, Verdict};
pub use invocation::{InboundMessage, Invocation};
pub use pipeline::Outcome;
pub use registry::{CommandDefinition, CommandRegistry};
pub use surface::{GuildIdentity, Reply, Requester, Surface};
