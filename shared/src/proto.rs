//! Protobuf job messages

use prost::Message;

/// A command issued to the agent
#[derive(Clone, PartialEq, Message)]
pub struct Command {
    #[prost(string, tag = "1")]
    pub name: String,

    #[prost(string, repeated, tag = "2")]
    pub args: Vec<String>,
}

/// Output of a command, returned to the job-reporting layer
#[derive(Clone, PartialEq, Eq, Message)]
pub struct Results {
    #[prost(string, tag = "1")]
    pub stdout: String,

    #[prost(string, tag = "2")]
    pub stderr: String,
}

/// A command tagged with the job it belongs to
#[derive(Clone, PartialEq, Message)]
pub struct Job {
    #[prost(string, tag = "1")]
    pub id: String,

    #[prost(message, optional, tag = "2")]
    pub command: Option<Command>,
}

/// Results tagged with the job they answer
#[derive(Clone, PartialEq, Message)]
pub struct JobResult {
    #[prost(string, tag = "1")]
    pub id: String,

    #[prost(message, optional, tag = "2")]
    pub results: Option<Results>,

    #[prost(uint64, tag = "3")]
    pub completed_at_ms: u64,
}
