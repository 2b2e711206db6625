//! Wire types exchanged between the engine and display clients

use serde::{Deserialize, Serialize};

use crate::state::{SessionType, TimerState};

/// Commands a display client can send to the engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Command {
    Start,
    Pause,
    Reset,
    SwitchSession { target: SessionType },
    GetState,
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Command::Start => "START",
            Command::Pause => "PAUSE",
            Command::Reset => "RESET",
            Command::SwitchSession { .. } => "SWITCH_SESSION",
            Command::GetState => "GET_STATE",
        }
    }
}

/// Engine reply to a [`Command`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CommandResponse {
    Ack { state: TimerState },
    State { state: TimerState },
    Rejected { reason: String, state: TimerState },
}

impl CommandResponse {
    pub fn state(&self) -> &TimerState {
        match self {
            CommandResponse::Ack { state }
            | CommandResponse::State { state }
            | CommandResponse::Rejected { state, .. } => state,
        }
    }

    pub fn is_rejected(&self) -> bool {
        matches!(self, CommandResponse::Rejected { .. })
    }
}

/// Broadcast from the engine to every attached client
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EngineEvent {
    StateUpdated {
        state: TimerState,
    },
    SessionComplete {
        #[serde(rename = "endedSession")]
        ended_session: SessionType,
    },
}

impl EngineEvent {
    pub fn event_name(&self) -> &'static str {
        match self {
            EngineEvent::StateUpdated { .. } => "STATE_UPDATED",
            EngineEvent::SessionComplete { .. } => "SESSION_COMPLETE",
        }
    }

    pub fn to_sse_data(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::SessionDurations;

    #[test]
    fn switch_command_wire_format() {
        let command: Command =
            serde_json::from_str(r#"{"type":"SWITCH_SESSION","target":"shortBreak"}"#).unwrap();
        assert_eq!(
            command,
            Command::SwitchSession {
                target: SessionType::ShortBreak
            }
        );

        let start: Command = serde_json::from_str(r#"{"type":"START"}"#).unwrap();
        assert_eq!(start.name(), "START");
    }

    #[test]
    fn session_complete_event_wire_format() {
        let event = EngineEvent::SessionComplete {
            ended_session: SessionType::Work,
        };
        let json: serde_json::Value = serde_json::from_str(&event.to_sse_data()).unwrap();
        assert_eq!(json["type"], "SESSION_COMPLETE");
        assert_eq!(json["endedSession"], "work");
    }

    #[test]
    fn rejected_response_carries_state() {
        let state = TimerState::initial(&SessionDurations::default());
        let response = CommandResponse::Rejected {
            reason: "running".to_string(),
            state: state.clone(),
        };
        let json = serde_json::to_value(&response).unwrap();

        assert_eq!(json["status"], "REJECTED");
        assert!(response.is_rejected());
        assert_eq!(response.state(), &state);
    }
}
