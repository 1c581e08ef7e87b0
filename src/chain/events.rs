//! Receipt log decoding for identifier-bearing Q&A events.

use alloy::primitives::{Address, U256};
use alloy::rpc::types::Log;
use alloy::sol_types::SolEvent;

use crate::chain::contracts::IQnA;

/// Events emitted by the Q&A contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QnaEvent {
    QuestionAsked,
    AnswerPosted,
    AnswerAccepted,
    BountyAdded,
    QuestionCancelled,
}

impl QnaEvent {
    pub fn name(&self) -> &'static str {
        match self {
            QnaEvent::QuestionAsked => "QuestionAsked",
            QnaEvent::AnswerPosted => "AnswerPosted",
            QnaEvent::AnswerAccepted => "AnswerAccepted",
            QnaEvent::BountyAdded => "BountyAdded",
            QnaEvent::QuestionCancelled => "QuestionCancelled",
        }
    }
}

/// A successfully decoded Q&A event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodedEvent {
    QuestionAsked { question_id: U256 },
    AnswerPosted { question_id: U256, answer_id: U256 },
    AnswerAccepted { question_id: U256, answer_id: U256 },
    BountyAdded { question_id: U256, amount: U256 },
    QuestionCancelled { question_id: U256 },
}

impl DecodedEvent {
    pub fn kind(&self) -> QnaEvent {
        match self {
            DecodedEvent::QuestionAsked { .. } => QnaEvent::QuestionAsked,
            DecodedEvent::AnswerPosted { .. } => QnaEvent::AnswerPosted,
            DecodedEvent::AnswerAccepted { .. } => QnaEvent::AnswerAccepted,
            DecodedEvent::BountyAdded { .. } => QnaEvent::BountyAdded,
            DecodedEvent::QuestionCancelled { .. } => QnaEvent::QuestionCancelled,
        }
    }

    /// The identifier the event introduces: the question for `QuestionAsked`,
    /// the answer for answer events.
    pub fn primary_id(&self) -> U256 {
        match self {
            DecodedEvent::QuestionAsked { question_id }
            | DecodedEvent::BountyAdded { question_id, .. }
            | DecodedEvent::QuestionCancelled { question_id } => *question_id,
            DecodedEvent::AnswerPosted { answer_id, .. }
            | DecodedEvent::AnswerAccepted { answer_id, .. } => *answer_id,
        }
    }
}

/// Decode one log against the Q&A interface. `None` if it is not a Q&A event
/// or its payload does not decode.
pub fn decode_log(log: &Log) -> Option<DecodedEvent> {
    let topic0 = *log.inner.data.topics().first()?;

    if topic0 == IQnA::QuestionAsked::SIGNATURE_HASH {
        let ev = log.log_decode::<IQnA::QuestionAsked>().ok()?.inner.data;
        Some(DecodedEvent::QuestionAsked {
            question_id: ev.questionId,
        })
    } else if topic0 == IQnA::AnswerPosted::SIGNATURE_HASH {
        let ev = log.log_decode::<IQnA::AnswerPosted>().ok()?.inner.data;
        Some(DecodedEvent::AnswerPosted {
            question_id: ev.questionId,
            answer_id: ev.answerId,
        })
    } else if topic0 == IQnA::AnswerAccepted::SIGNATURE_HASH {
        let ev = log.log_decode::<IQnA::AnswerAccepted>().ok()?.inner.data;
        Some(DecodedEvent::AnswerAccepted {
            question_id: ev.questionId,
            answer_id: ev.answerId,
        })
    } else if topic0 == IQnA::BountyAdded::SIGNATURE_HASH {
        let ev = log.log_decode::<IQnA::BountyAdded>().ok()?.inner.data;
        Some(DecodedEvent::BountyAdded {
            question_id: ev.questionId,
            amount: ev.amount,
        })
    } else if topic0 == IQnA::QuestionCancelled::SIGNATURE_HASH {
        let ev = log.log_decode::<IQnA::QuestionCancelled>().ok()?.inner.data;
        Some(DecodedEvent::QuestionCancelled {
            question_id: ev.questionId,
        })
    } else {
        None
    }
}

/// Scan receipt logs in order and return the identifier carried by the first
/// log from `contract` that decodes as `expected`.
///
/// Logs that fail to decode or decode as a different event are skipped.
/// An identifier wider than 64 bits is treated as absent.
pub fn extract_emitted_id(logs: &[Log], contract: Address, expected: QnaEvent) -> Option<u64> {
    logs.iter()
        .filter(|log| log.inner.address == contract)
        .filter_map(decode_log)
        .find(|event| event.kind() == expected)
        .and_then(|event| u64::try_from(event.primary_id()).ok())
}
