//! zkml-aggregate — folds accumulation-friendly proofs into one.
//!
//! Member proofs produced in `accum` mode embed an accumulator binding
//! their verifying key, public instances, and trace commitment. The
//! aggregator folds these bindings under a Fiat–Shamir challenge into a
//! single running digest; the aggregate verifier replays the fold from
//! the member statements and accepts only the matching digest.
//!
//! In `safe` mode every member proof is fully re-verified before it is
//! folded; `unsafe` mode folds the bindings as-is and trusts that the
//! members were checked elsewhere. The aggregate circuit is larger than
//! any member, so aggregation demands a bigger SRS than proving did.

#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![warn(missing_docs, clippy::all)]

use serde::{Deserialize, Serialize};
use thiserror::Error as ThisError;
use tracing::{debug, info};

use zkml_core::{content_digest, short_hex, Error, ProofArtifact, TranscriptType};
use zkml_crypto::{instances_digest, Transcript};
use zkml_pfsys::prover::ProofBody;
use zkml_pfsys::{make_transcript, verify, Srs, VerifyingKey};

/// On-disk aggregate artifact format version.
pub const AGGREGATE_FORMAT_VERSION: u16 = 1;

/// Transcript domain separator for the aggregation fold.
pub const AGGREGATE_DOMAIN: &str = "zkml/aggregate/v1";

/// Extra row budget (log2) the aggregation circuit needs on top of the
/// largest member circuit.
pub const AGGREGATE_OVERHEAD_LOGROWS: u32 = 1;

/// Errors raised while aggregating or checking an aggregate.
#[derive(Debug, ThisError)]
pub enum AggregateError {
    /// Aggregation needs at least one member proof.
    #[error("aggregation requires at least one proof")]
    EmptyBatch,

    /// A member proof was produced in `single` mode.
    #[error("proof {index} is not accumulation-friendly (proved in single mode)")]
    NotAccumulationFriendly {
        /// Position of the offending proof in the batch.
        index: usize,
    },

    /// A member proof failed full verification in safe mode.
    #[error("proof {index} failed verification during safe aggregation")]
    MemberVerification {
        /// Position of the offending proof in the batch.
        index: usize,
    },

    /// A member proof's bytes do not decode or carry no accumulator.
    #[error("proof {index} is malformed: {reason}")]
    MalformedMember {
        /// Position of the offending proof in the batch.
        index: usize,
        /// Decode or structure failure.
        reason: String,
    },

    /// A member's accumulator does not bind its key and instances.
    #[error("proof {index}'s accumulator does not bind its key and instances")]
    BindingMismatch {
        /// Position of the offending proof in the batch.
        index: usize,
    },

    /// A lifecycle error (SRS mismatch, I/O, codec).
    #[error(transparent)]
    Core(#[from] Error),
}

/// Whether member proofs are re-verified before folding.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AccumulationMode {
    /// Re-verify every member proof before folding it.
    Safe,
    /// Fold the embedded bindings without re-verifying the members.
    Unsafe,
}

impl std::fmt::Display for AccumulationMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Safe => write!(f, "safe"),
            Self::Unsafe => write!(f, "unsafe"),
        }
    }
}

/// The folded statement of one member proof.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MemberStatement {
    /// Digest of the member's verifying key.
    pub vk_digest: [u8; 32],
    /// The member's public instances.
    pub instances: Vec<[u8; 32]>,
    /// The member's trace commitment root.
    pub root: [u8; 32],
}

/// An aggregate proof over a batch of member statements.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AggregateProof {
    /// Format version, currently [`AGGREGATE_FORMAT_VERSION`].
    pub version: u16,
    /// Fiat–Shamir strategy of the fold.
    pub transcript: TranscriptType,
    /// One statement per member, in batch order.
    pub members: Vec<MemberStatement>,
    /// The fold challenge squeezed after absorbing every statement.
    pub challenge: [u8; 32],
    /// The running fold digest the verifier must reproduce.
    pub folded: [u8; 32],
}

/// Verification key for an aggregate proof.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AggregateVerifyingKey {
    /// Format version, currently [`AGGREGATE_FORMAT_VERSION`].
    pub version: u16,
    /// Log2 row budget of the aggregation circuit.
    pub logrows: u32,
    /// Digest of the SRS the aggregate was built against.
    pub srs_digest: [u8; 32],
    /// Expected member verifying-key digests, in batch order.
    pub member_vk_digests: Vec<[u8; 32]>,
}

impl AggregateVerifyingKey {
    /// Content digest of the aggregate key.
    pub fn digest(&self) -> Result<[u8; 32], Error> {
        let bytes = zkml_core::to_cbor(self)?;
        Ok(content_digest("zkml/aggregate-vk/v1", &[&bytes]))
    }
}

/// Replay the fold over `members`, returning the challenge and the
/// final digest. Shared verbatim by prover and verifier.
fn fold(strategy: TranscriptType, members: &[MemberStatement]) -> ([u8; 32], [u8; 32]) {
    let mut tr = make_transcript(strategy, AGGREGATE_DOMAIN);
    tr.absorb_u64("members", members.len() as u64);
    for m in members {
        tr.absorb("vk", &m.vk_digest);
        tr.absorb("instances", &instances_digest(&m.instances));
        tr.absorb("root", &m.root);
    }
    let raw = tr.challenge_bytes("fold", 32);
    let mut challenge = [0u8; 32];
    challenge.copy_from_slice(&raw);

    let mut running = [0u8; 32];
    for m in members {
        running = content_digest(
            "zkml/fold/v1",
            &[
                &running,
                &challenge,
                &m.vk_digest,
                &instances_digest(&m.instances),
                &m.root,
            ],
        );
    }
    (challenge, running)
}

/// Fold a batch of accumulation-friendly proofs into one aggregate.
///
/// All members must share `srs`. Safe mode re-verifies each member and
/// refuses to fold an invalid one.
pub fn aggregate(
    members: &[(ProofArtifact, VerifyingKey)],
    srs: &Srs,
    mode: AccumulationMode,
    strategy: TranscriptType,
) -> Result<(AggregateProof, AggregateVerifyingKey), AggregateError> {
    if members.is_empty() {
        return Err(AggregateError::EmptyBatch);
    }

    let max_member_logrows = members.iter().map(|(_, vk)| vk.logrows).max().unwrap_or(0);
    let batch_logrows = (members.len() as u64).next_power_of_two().trailing_zeros();
    let needed = max_member_logrows + batch_logrows + AGGREGATE_OVERHEAD_LOGROWS;
    if !srs.supports(needed) {
        return Err(Error::SrsTooSmall {
            needed,
            available: srs.logrows,
        }
        .into());
    }

    let mut statements = Vec::with_capacity(members.len());
    let mut member_vk_digests = Vec::with_capacity(members.len());
    for (index, (artifact, vk)) in members.iter().enumerate() {
        if !artifact.is_aggregatable() {
            return Err(AggregateError::NotAccumulationFriendly { index });
        }
        if mode == AccumulationMode::Safe && !verify(vk, srs, artifact)? {
            return Err(AggregateError::MemberVerification { index });
        }

        let body: ProofBody = bincode::deserialize(artifact.bytes()).map_err(|e| {
            AggregateError::MalformedMember {
                index,
                reason: e.to_string(),
            }
        })?;
        let acc = body
            .accumulator
            .ok_or_else(|| AggregateError::MalformedMember {
                index,
                reason: "accum-mode proof carries no accumulator".into(),
            })?;

        let vk_digest = vk.digest().map_err(AggregateError::Core)?;
        if acc.vk_digest != vk_digest
            || acc.instances_digest != instances_digest(&artifact.instances)
            || acc.root != body.root
        {
            return Err(AggregateError::BindingMismatch { index });
        }
        debug!(index, vk = %short_hex(&vk_digest), "folded member");
        statements.push(MemberStatement {
            vk_digest,
            instances: artifact.instances.clone(),
            root: body.root,
        });
        member_vk_digests.push(vk_digest);
    }

    let (challenge, folded) = fold(strategy, &statements);
    let proof = AggregateProof {
        version: AGGREGATE_FORMAT_VERSION,
        transcript: strategy,
        members: statements,
        challenge,
        folded,
    };
    let avk = AggregateVerifyingKey {
        version: AGGREGATE_FORMAT_VERSION,
        logrows: needed,
        srs_digest: srs.digest(),
        member_vk_digests,
    };
    info!(
        members = proof.members.len(),
        logrows = needed,
        %mode,
        %strategy,
        "aggregated batch"
    );
    Ok((proof, avk))
}

/// Check an aggregate proof against its key and SRS.
///
/// Rejection is `Ok(false)`; an SRS the key was not built against is an
/// error.
pub fn verify_aggregate(
    avk: &AggregateVerifyingKey,
    srs: &Srs,
    proof: &AggregateProof,
) -> Result<bool, AggregateError> {
    let srs_digest = srs.digest();
    if srs_digest != avk.srs_digest {
        return Err(Error::SrsMismatch {
            key: short_hex(&avk.srs_digest),
            srs: short_hex(&srs_digest),
        }
        .into());
    }
    if proof.version != AGGREGATE_FORMAT_VERSION || avk.version != AGGREGATE_FORMAT_VERSION {
        debug!("rejecting: aggregate format version mismatch");
        return Ok(false);
    }
    if proof.members.len() != avk.member_vk_digests.len() {
        debug!("rejecting: member count mismatch");
        return Ok(false);
    }
    for (m, expected) in proof.members.iter().zip(avk.member_vk_digests.iter()) {
        if m.vk_digest != *expected {
            debug!("rejecting: member key digest mismatch");
            return Ok(false);
        }
    }

    let (challenge, folded) = fold(proof.transcript, &proof.members);
    if challenge != proof.challenge || folded != proof.folded {
        debug!("rejecting: fold digest does not replay");
        return Ok(false);
    }
    Ok(true)
}
