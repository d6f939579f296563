//! Data models for Canvass entities.
//!
//! This module contains the data structures exchanged with the backend:
//!
//! - `UserRecord`, `RegistrationForm`, `ProfileUpdate`: account data
//! - `CampaignMessage`, `CampaignQuery`, `EngagementReceipt`: campaign posts
//! - `PointsData`, `WithdrawalRecord`, `WithdrawalRequest`: points and payouts
//! - `Region`, `Constituency`: geographic scoping
//!
//! The backend is loosely typed, so most fields go through the lenient
//! deserializers in `de`.

pub mod campaign;
pub mod de;
pub mod points;
pub mod region;
pub mod user;

pub use campaign::{Author, CampaignMessage, CampaignQuery, CampaignScope, CampaignSort, EngagementReceipt};
pub use points::{PointsData, UserBalance, WithdrawalReceipt, WithdrawalRecord, WithdrawalRequest, WithdrawalStatus};
pub use region::{Constituency, Region};
pub use user::{AvatarUpload, ProfileUpdate, RegistrationForm, UserRecord};
