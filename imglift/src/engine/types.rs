//! Wire-format types for the management API.
//!
//! Request/response serde structs plus the status and phase enums the
//! orchestrator polls on. The engine owns these objects; the structs here are
//! read-side snapshots and write-side requests, nothing more.

use serde::{Deserialize, Serialize};

// ============================================================================
// Disks
// ============================================================================

/// Disk creation request.
///
/// Provisioned and initial size both carry the image's virtual size; the wire
/// transfer itself is accounted in physical bytes by the data plane.
#[derive(Debug, Clone, Serialize)]
pub struct DiskCreateRequest {
    pub alias: String,
    pub format: DiskFormat,
    pub sparse: bool,
    pub provisioned_size: u64,
    pub initial_size: u64,
    pub storage_domains: Vec<StorageDomainRef>,
}

/// Reference to a storage domain by id.
#[derive(Debug, Clone, Serialize)]
pub struct StorageDomainRef {
    pub id: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiskFormat {
    /// Copy-on-write (qcow).
    Cow,
    Raw,
}

/// Engine-side view of a disk.
#[derive(Debug, Clone, Deserialize)]
pub struct Disk {
    pub id: String,
    #[serde(default)]
    pub alias: Option<String>,
    pub status: DiskStatus,
}

/// Disk lifecycle status as reported by the engine.
///
/// A disk that stops existing altogether (fetch returns not-found) has been
/// removed by the engine; that case is represented by an absent disk, not a
/// status value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiskStatus {
    /// The engine is still working on the disk.
    Locked,
    /// Ready for use.
    Ok,
    /// The disk content is unusable.
    Illegal,
}

impl DiskStatus {
    pub fn is_ready(&self) -> bool {
        matches!(self, DiskStatus::Ok)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DiskStatus::Locked => "locked",
            DiskStatus::Ok => "ok",
            DiskStatus::Illegal => "illegal",
        }
    }
}

impl std::fmt::Display for DiskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// Image transfers
// ============================================================================

/// Image transfer creation request, bound to a disk's image identity.
#[derive(Debug, Clone, Serialize)]
pub struct TransferCreateRequest {
    pub image: ImageRef,
}

#[derive(Debug, Clone, Serialize)]
pub struct ImageRef {
    pub id: String,
}

/// Engine-side view of an image transfer.
#[derive(Debug, Clone, Deserialize)]
pub struct ImageTransfer {
    pub id: String,
    pub phase: TransferPhase,
    /// Direct data-plane endpoint on the node holding the image.
    #[serde(default)]
    pub transfer_url: Option<String>,
    /// Universally reachable data-plane proxy.
    #[serde(default)]
    pub proxy_url: Option<String>,
}

/// Transfer session phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransferPhase {
    Initializing,
    Transferring,
    Paused,
    Finished,
    Cancelled,
}

impl TransferPhase {
    /// The data plane accepts bytes only in this phase.
    pub fn is_transferring(&self) -> bool {
        matches!(self, TransferPhase::Transferring)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, TransferPhase::Finished | TransferPhase::Cancelled)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TransferPhase::Initializing => "initializing",
            TransferPhase::Transferring => "transferring",
            TransferPhase::Paused => "paused",
            TransferPhase::Finished => "finished",
            TransferPhase::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for TransferPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// Faults
// ============================================================================

#[derive(Debug, Deserialize)]
pub(crate) struct FaultResponse {
    pub fault: Fault,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Fault {
    pub reason: String,
    #[serde(default)]
    pub detail: Option<String>,
}
