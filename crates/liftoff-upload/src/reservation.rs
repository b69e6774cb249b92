//! Reservation and commit documents
//!
//! An asset upload is a three step exchange with App Store Connect:
//! reserve (create the asset resource, which answers with upload
//! operations), upload the parts, then commit (mark the resource uploaded,
//! usually with a checksum). This module holds the JSON:API shapes on either
//! side of the upload step. Sending them is left to an authenticated client.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::operation::UploadOperation;

/// Kinds of assets that are uploaded through reservations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AssetKind {
    /// Screenshot in an app screenshot set
    AppScreenshot,
    /// Video preview in an app preview set
    AppPreview,
    /// Image of a Game Center achievement localization
    GameCenterAchievementImage,
}

impl AssetKind {
    /// Every supported kind
    pub const ALL: [AssetKind; 3] = [
        Self::AppScreenshot,
        Self::AppPreview,
        Self::GameCenterAchievementImage,
    ];

    /// Look up the kind for a JSON:API resource type
    pub fn from_resource_type(resource_type: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.resource_type() == resource_type)
    }

    /// JSON:API resource type of the asset
    pub fn resource_type(&self) -> &'static str {
        match self {
            Self::AppScreenshot => "appScreenshots",
            Self::AppPreview => "appPreviews",
            Self::GameCenterAchievementImage => "gameCenterAchievementImages",
        }
    }

    /// Relationship linking the asset to its parent
    pub fn parent_relationship(&self) -> &'static str {
        match self {
            Self::AppScreenshot => "appScreenshotSet",
            Self::AppPreview => "appPreviewSet",
            Self::GameCenterAchievementImage => "gameCenterAchievementLocalization",
        }
    }

    /// JSON:API resource type of the parent
    pub fn parent_type(&self) -> &'static str {
        match self {
            Self::AppScreenshot => "appScreenshotSets",
            Self::AppPreview => "appPreviewSets",
            Self::GameCenterAchievementImage => "gameCenterAchievementLocalizations",
        }
    }

    /// Whether the commit call accepts a source file checksum
    pub fn accepts_checksum(&self) -> bool {
        matches!(self, Self::AppScreenshot | Self::AppPreview)
    }
}

impl fmt::Display for AssetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.resource_type())
    }
}

/// Response to a reserve call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetReservation {
    pub data: ReservedAsset,
}

/// The reserved asset resource
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReservedAsset {
    pub id: String,

    #[serde(rename = "type")]
    pub resource_type: String,

    #[serde(default)]
    pub attributes: ReservedAssetAttributes,
}

/// Attributes of a reserved asset
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReservedAssetAttributes {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_size: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_file_checksum: Option<String>,

    /// Null until the asset has been reserved
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upload_operations: Option<Vec<UploadOperation>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub asset_delivery_state: Option<AssetDeliveryState>,
}

/// Processing state of an uploaded asset
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AssetDeliveryState {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<DeliveryState>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<AssetStateDetail>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<AssetStateDetail>,
}

/// Delivery state values reported by App Store Connect
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DeliveryState {
    AwaitingUpload,
    UploadComplete,
    Complete,
    Failed,
    #[serde(other)]
    Unknown,
}

/// An error or warning attached to an asset's delivery state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetStateDetail {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

impl fmt::Display for AssetStateDetail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.code, &self.description) {
            (Some(code), Some(description)) => write!(f, "{}: {}", code, description),
            (Some(code), None) => f.write_str(code),
            (None, Some(description)) => f.write_str(description),
            (None, None) => f.write_str("unknown"),
        }
    }
}

impl AssetReservation {
    /// Upload operations handed out by the reservation
    pub fn upload_operations(&self) -> &[UploadOperation] {
        self.data
            .attributes
            .upload_operations
            .as_deref()
            .unwrap_or_default()
    }

    /// Kind of the reserved asset, when it is one we know
    pub fn kind(&self) -> Option<AssetKind> {
        AssetKind::from_resource_type(&self.data.resource_type)
    }

    /// Build the commit document for this reservation.
    ///
    /// The checksum is dropped for kinds whose commit does not take one.
    pub fn commit(&self, checksum: Option<String>) -> CommitRequest {
        let checksum = match self.kind() {
            Some(kind) if !kind.accepts_checksum() => None,
            _ => checksum,
        };
        CommitRequest::new(&self.data.resource_type, &self.data.id, checksum)
    }
}

/// Anything a caller may hand us as "the reservation"
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum ReservationDocument {
    /// A full reserve response
    Reservation(AssetReservation),
    /// A bare list of upload operations
    Operations(Vec<UploadOperation>),
    /// Just the attributes of the reserved resource
    Attributes(ReservedAssetAttributes),
}

impl ReservationDocument {
    /// Parse a reservation document
    pub fn parse(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    /// Upload operations carried by the document
    pub fn upload_operations(&self) -> &[UploadOperation] {
        match self {
            Self::Reservation(reservation) => reservation.upload_operations(),
            Self::Attributes(attributes) => {
                attributes.upload_operations.as_deref().unwrap_or_default()
            }
            Self::Operations(operations) => operations,
        }
    }

    /// The reservation, when the document is a full reserve response
    pub fn reservation(&self) -> Option<&AssetReservation> {
        match self {
            Self::Reservation(reservation) => Some(reservation),
            _ => None,
        }
    }
}

/// Body of a reserve call
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReservationRequest {
    pub data: ReservationRequestData,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReservationRequestData {
    #[serde(rename = "type")]
    pub resource_type: String,
    pub attributes: ReservationAttributes,
    pub relationships: BTreeMap<String, RelationshipDeclaration>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReservationAttributes {
    pub file_name: String,
    pub file_size: u64,
}

/// A `{ "data": { "type", "id" } }` relationship
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelationshipDeclaration {
    pub data: RelationshipData,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelationshipData {
    #[serde(rename = "type")]
    pub resource_type: String,
    pub id: String,
}

impl ReservationRequest {
    /// Reserve an asset of `kind` named `file_name` under the parent `parent_id`
    pub fn new(
        kind: AssetKind,
        file_name: impl Into<String>,
        file_size: u64,
        parent_id: impl Into<String>,
    ) -> Self {
        let mut relationships = BTreeMap::new();
        relationships.insert(
            kind.parent_relationship().to_string(),
            RelationshipDeclaration {
                data: RelationshipData {
                    resource_type: kind.parent_type().to_string(),
                    id: parent_id.into(),
                },
            },
        );

        Self {
            data: ReservationRequestData {
                resource_type: kind.resource_type().to_string(),
                attributes: ReservationAttributes {
                    file_name: file_name.into(),
                    file_size,
                },
                relationships,
            },
        }
    }
}

/// Body of a commit call
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommitRequest {
    pub data: CommitRequestData,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommitRequestData {
    #[serde(rename = "type")]
    pub resource_type: String,
    pub id: String,
    pub attributes: CommitAttributes,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitAttributes {
    pub uploaded: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_file_checksum: Option<String>,
}

impl CommitRequest {
    /// Mark the asset `id` of `resource_type` as uploaded
    pub fn new(resource_type: &str, id: &str, checksum: Option<String>) -> Self {
        Self {
            data: CommitRequestData {
                resource_type: resource_type.to_string(),
                id: id.to_string(),
                attributes: CommitAttributes {
                    uploaded: true,
                    source_file_checksum: checksum,
                },
            },
        }
    }

    /// API path the commit is sent to with PATCH
    pub fn path(&self) -> String {
        format!("/{}/{}", self.data.resource_type, self.data.id)
    }
}
