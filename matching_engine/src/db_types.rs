use std::{fmt::Display, str::FromStr};

use chrono::{DateTime, Utc};
use mkt_common::Amount;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[error("Invalid value for {0}: {1}")]
pub struct ConversionError(&'static str, String);

/// Implements `Display` and `FromStr` for a fieldless enum using the same lowercase names that are written to the
/// database and used in JSON payloads.
macro_rules! string_enum {
    ($type:ident { $($variant:ident => $name:literal),+ $(,)? }) => {
        impl Display for $type {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                match self {
                    $(Self::$variant => write!(f, $name),)+
                }
            }
        }

        impl FromStr for $type {
            type Err = ConversionError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.trim().to_ascii_lowercase().as_str() {
                    $($name => Ok(Self::$variant),)+
                    other => Err(ConversionError(stringify!($type), other.to_string())),
                }
            }
        }
    };
}

//--------------------------------------       ActorId       ---------------------------------------------------------
/// The identity of a marketplace participant, as supplied by the identity provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Type, Serialize, Deserialize)]
#[sqlx(transparent)]
#[serde(transparent)]
pub struct ActorId(pub i64);

impl Display for ActorId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "actor#{}", self.0)
    }
}

impl From<i64> for ActorId {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

//--------------------------------------      ActorRole      ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ActorRole {
    /// A supplier. Posts requests and proposes against projects.
    Producer,
    /// A visitor (travelling sales agent). Posts projects and responds to requests.
    Consumer,
    /// Marketplace staff. Never a party to a solicitation.
    Admin,
}

string_enum!(ActorRole { Producer => "producer", Consumer => "consumer", Admin => "admin" });

/// An authenticated caller. The engine trusts these values; verifying them is the identity provider's job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub id: ActorId,
    pub role: ActorRole,
}

impl Actor {
    pub fn new<I: Into<ActorId>>(id: I, role: ActorRole) -> Self {
        Self { id: id.into(), role }
    }

    pub fn producer<I: Into<ActorId>>(id: I) -> Self {
        Self::new(id, ActorRole::Producer)
    }

    pub fn consumer<I: Into<ActorId>>(id: I) -> Self {
        Self::new(id, ActorRole::Consumer)
    }

    pub fn admin<I: Into<ActorId>>(id: I) -> Self {
        Self::new(id, ActorRole::Admin)
    }
}

impl Display for Actor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.id, self.role)
    }
}

//--------------------------------------    SolicitationId   ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(transparent)]
#[serde(transparent)]
pub struct SolicitationId(pub i64);

impl Display for SolicitationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl From<i64> for SolicitationId {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

//--------------------------------------   SolicitationKind  ---------------------------------------------------------
/// The two kinds of solicitation share one state machine and differ in who posts, who responds, and how a
/// positive response is treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum SolicitationKind {
    /// Posted by a producer looking for a single accepting consumer.
    Request,
    /// Posted by a consumer looking for one or more interested producers.
    Project,
}

string_enum!(SolicitationKind { Request => "request", Project => "project" });

/// What a positive candidate response does to its solicitation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcceptancePolicy {
    /// The first positive response wins and latches the solicitation to `accepted`.
    SingleWinner,
    /// Positive responses are counted; the poster picks a winner later.
    Shortlist,
}

impl SolicitationKind {
    pub const ALL: [SolicitationKind; 2] = [SolicitationKind::Request, SolicitationKind::Project];

    pub fn poster_role(&self) -> ActorRole {
        match self {
            Self::Request => ActorRole::Producer,
            Self::Project => ActorRole::Consumer,
        }
    }

    pub fn responder_role(&self) -> ActorRole {
        match self {
            Self::Request => ActorRole::Consumer,
            Self::Project => ActorRole::Producer,
        }
    }

    pub fn acceptance_policy(&self) -> AcceptancePolicy {
        match self {
            Self::Request => AcceptancePolicy::SingleWinner,
            Self::Project => AcceptancePolicy::Shortlist,
        }
    }

    /// The response kind that signals a match for this kind of solicitation.
    pub fn positive_response(&self) -> ResponseKind {
        match self {
            Self::Request => ResponseKind::Accepted,
            Self::Project => ResponseKind::Interested,
        }
    }

    pub fn allows_response(&self, kind: ResponseKind) -> bool {
        matches!(kind, ResponseKind::Rejected | ResponseKind::Question) || kind == self.positive_response()
    }
}

//-------------------------------------- SolicitationStatus  ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum SolicitationStatus {
    /// Newly created and open to responses.
    Pending,
    /// Administratively activated. Behaves exactly like `Pending` for matching.
    Active,
    /// A counterparty has been accepted. Never reverts.
    Accepted,
    /// Withdrawn by the poster before acceptance.
    Cancelled,
    /// The deadline passed before anyone was accepted.
    Expired,
    /// The work is finished.
    Completed,
}

string_enum!(SolicitationStatus {
    Pending => "pending",
    Active => "active",
    Accepted => "accepted",
    Cancelled => "cancelled",
    Expired => "expired",
    Completed => "completed",
});

impl SolicitationStatus {
    /// Statuses in which the solicitation is still looking for a counterparty.
    pub const OPEN: [SolicitationStatus; 2] = [SolicitationStatus::Pending, SolicitationStatus::Active];

    pub fn is_open(&self) -> bool {
        Self::OPEN.contains(self)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Cancelled | Self::Expired | Self::Completed)
    }
}

//--------------------------------------    Solicitation     ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct Solicitation {
    pub id: SolicitationId,
    pub kind: SolicitationKind,
    pub posted_by: ActorId,
    pub item_name: String,
    pub quantity: i64,
    pub unit: String,
    pub destination: Option<String>,
    pub target_location: Option<String>,
    pub price: Amount,
    pub currency: String,
    pub payment_terms: Option<String>,
    pub delivery_time: Option<String>,
    pub description: Option<String>,
    pub deadline: DateTime<Utc>,
    pub status: SolicitationStatus,
    /// The number of positive candidate responses that have been counted against this solicitation.
    pub matched_count: i64,
    pub accepted_counterparty: Option<ActorId>,
    pub accepted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Solicitation {
    pub fn is_owned_by(&self, actor: ActorId) -> bool {
        self.posted_by == actor
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}

//--------------------------------------   NewSolicitation   ---------------------------------------------------------
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewSolicitation {
    pub kind: SolicitationKind,
    pub item_name: String,
    #[serde(default = "default_quantity")]
    pub quantity: i64,
    #[serde(default)]
    pub unit: String,
    #[serde(default)]
    pub destination: Option<String>,
    #[serde(default)]
    pub target_location: Option<String>,
    #[serde(default)]
    pub price: Amount,
    #[serde(default = "default_currency")]
    pub currency: String,
    #[serde(default)]
    pub payment_terms: Option<String>,
    #[serde(default)]
    pub delivery_time: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    pub deadline: DateTime<Utc>,
}

fn default_quantity() -> i64 {
    1
}

fn default_currency() -> String {
    mkt_common::DEFAULT_CURRENCY_CODE.to_string()
}

impl NewSolicitation {
    pub fn new<S: Into<String>>(kind: SolicitationKind, item_name: S, deadline: DateTime<Utc>) -> Self {
        Self {
            kind,
            item_name: item_name.into(),
            quantity: default_quantity(),
            unit: String::default(),
            destination: None,
            target_location: None,
            price: Amount::default(),
            currency: default_currency(),
            payment_terms: None,
            delivery_time: None,
            description: None,
            deadline,
        }
    }

    pub fn with_quantity<S: Into<String>>(mut self, quantity: i64, unit: S) -> Self {
        self.quantity = quantity;
        self.unit = unit.into();
        self
    }

    pub fn with_price<S: Into<String>>(mut self, price: Amount, currency: S) -> Self {
        self.price = price;
        self.currency = currency.into();
        self
    }

    pub fn with_destination<S: Into<String>>(mut self, destination: S) -> Self {
        self.destination = Some(destination.into());
        self
    }

    pub fn with_description<S: Into<String>>(mut self, description: S) -> Self {
        self.description = Some(description.into());
        self
    }
}

//--------------------------------------    ResponseKind     ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ResponseKind {
    /// A consumer accepts a request. Positive for requests only.
    Accepted,
    /// A producer is interested in a project. Positive for projects only.
    Interested,
    Rejected,
    /// Asks the poster something. Must carry a message.
    Question,
}

string_enum!(ResponseKind {
    Accepted => "accepted",
    Interested => "interested",
    Rejected => "rejected",
    Question => "question",
});

impl ResponseKind {
    pub fn is_positive(&self) -> bool {
        matches!(self, Self::Accepted | Self::Interested)
    }
}

//--------------------------------------   ResponseStatus    ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ResponseStatus {
    Pending,
    /// The responder was picked. Active positive responses count towards a producer's load.
    Active,
    Closed,
}

string_enum!(ResponseStatus { Pending => "pending", Active => "active", Closed => "closed" });

//--------------------------------------  CandidateResponse  ---------------------------------------------------------
/// A response to a request, or a proposal against a project.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct CandidateResponse {
    pub id: i64,
    pub solicitation_id: SolicitationId,
    pub responder_id: ActorId,
    pub kind: ResponseKind,
    pub message: Option<String>,
    pub offered_price: Option<Amount>,
    pub status: ResponseStatus,
    pub notification_sent: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewCandidateResponse {
    pub kind: ResponseKind,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub offered_price: Option<Amount>,
}

impl NewCandidateResponse {
    pub fn new(kind: ResponseKind) -> Self {
        Self { kind, message: None, offered_price: None }
    }

    pub fn with_message<S: Into<String>>(mut self, message: S) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn with_offered_price(mut self, price: Amount) -> Self {
        self.offered_price = Some(price);
        self
    }

    /// True if the message is missing or contains only whitespace.
    pub fn has_empty_message(&self) -> bool {
        self.message.as_deref().map(str::trim).unwrap_or_default().is_empty()
    }
}

//--------------------------------------       Rating        ---------------------------------------------------------
pub const MIN_RATING_SCORE: i64 = 1;
pub const MAX_RATING_SCORE: i64 = 5;

#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct Rating {
    pub id: i64,
    pub solicitation_id: SolicitationId,
    pub rater_id: ActorId,
    pub rater_role: ActorRole,
    pub rated_id: ActorId,
    pub rated_role: ActorRole,
    pub score: i64,
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewRating {
    pub solicitation_id: SolicitationId,
    pub rater_id: ActorId,
    pub rater_role: ActorRole,
    pub rated_id: ActorId,
    pub rated_role: ActorRole,
    pub score: i64,
    pub comment: Option<String>,
}

/// The aggregate rating for one participant. `mean` is zero when there are no ratings.
#[derive(Debug, Clone, Copy, Default, PartialEq, FromRow, Serialize, Deserialize)]
pub struct RatingSummary {
    pub mean: f64,
    pub count: i64,
}

//--------------------------------------    Conversation     ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ConversationStatus {
    Active,
    Archived,
}

string_enum!(ConversationStatus { Active => "active", Archived => "archived" });

#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct Conversation {
    pub id: i64,
    pub project_id: SolicitationId,
    pub consumer_id: ActorId,
    pub producer_id: ActorId,
    pub status: ConversationStatus,
    pub last_message_at: Option<DateTime<Utc>>,
    pub last_message_preview: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Conversation {
    /// The role `actor` plays in this conversation, if they are a participant at all.
    pub fn participant_role(&self, actor: ActorId) -> Option<ActorRole> {
        if actor == self.consumer_id {
            Some(ActorRole::Consumer)
        } else if actor == self.producer_id {
            Some(ActorRole::Producer)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct ConversationMessage {
    pub id: i64,
    pub conversation_id: i64,
    pub sender_id: ActorId,
    pub sender_role: ActorRole,
    pub body: String,
    pub attachment: Option<String>,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewMessage {
    pub body: String,
    #[serde(default)]
    pub attachment: Option<String>,
}

impl NewMessage {
    pub fn new<S: Into<String>>(body: S) -> Self {
        Self { body: body.into(), attachment: None }
    }

    pub fn with_attachment<S: Into<String>>(mut self, attachment: S) -> Self {
        self.attachment = Some(attachment.into());
        self
    }
}

//--------------------------------------      Supplier       ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum SupplierStatus {
    Pending,
    Approved,
    Rejected,
}

string_enum!(SupplierStatus { Pending => "pending", Approved => "approved", Rejected => "rejected" });

#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct Supplier {
    pub id: i64,
    pub actor_id: ActorId,
    pub name: String,
    pub status: SupplierStatus,
    pub featured: bool,
    pub featured_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

//--------------------------------------    Notifications    ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    ResponseReceived,
    SolicitationAccepted,
}

string_enum!(NotificationKind {
    ResponseReceived => "response_received",
    SolicitationAccepted => "solicitation_accepted",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum NotificationStatus {
    Pending,
    Sent,
    Failed,
}

string_enum!(NotificationStatus { Pending => "pending", Sent => "sent", Failed => "failed" });

/// A notice handed to the notification dispatcher.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notice {
    pub solicitation_id: SolicitationId,
    pub response_id: Option<i64>,
    pub recipient: ActorId,
    pub kind: NotificationKind,
    pub message: String,
}

/// The record of one delivery attempt.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct NotificationAttempt {
    pub id: i64,
    pub solicitation_id: SolicitationId,
    pub response_id: Option<i64>,
    pub recipient_id: ActorId,
    pub kind: NotificationKind,
    pub status: NotificationStatus,
    pub message: String,
    pub error: Option<String>,
    pub sent_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}
