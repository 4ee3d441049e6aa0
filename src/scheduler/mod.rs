pub mod controller;
pub mod invalidation;
pub mod policy;

pub use controller::{
    FlushPhase, FlushReport, FlushRequest, FlushTarget, RenderController, RenderFailure,
};
pub use invalidation::{InvalidationTopic, InvalidationTopics, UpdateInbox};
pub use policy::{
    AnimationFramePolicy, FlushTiming, ImmediatePolicy, RenderPolicy, RenderPolicyKind,
    SchedulerConfig, TimeoutPolicy,
};
