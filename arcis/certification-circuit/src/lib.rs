//! Arcium Encrypted Instructions for Building Certification
//!
//! This file defines the confidential computations that run inside the
//! MXE. The circuits evaluate certification policy over encrypted
//! measurements - the MXE nodes never see a plaintext consumption or
//! efficiency value, and only the one-bit verdict can ever leave the
//! encrypted domain.
//!
//! Location: arcis/certification-circuit/src/lib.rs

use arcis::prelude::*;

/// Mark this module as containing encrypted circuits
#[encrypted]
mod circuits {
    use arcis::prelude::*;

    // ==================== DATA STRUCTURES ====================

    /// Encrypted measurement set from a building owner
    /// The values are encrypted before leaving the submitter's machine
    #[derive(Clone)]
    pub struct BuildingMetrics {
        /// Annual energy consumption in kWh/m²
        pub energy_consumption: u64,
        /// Efficiency score on the 0-100 scale
        pub efficiency_score: u64,
    }

    /// Policy verdict, encrypted until the authority reveals it
    pub struct PolicyVerdict {
        /// 1 = meets policy, 0 = fails policy
        pub meets_policy: u8,
    }

    // ==================== ENCRYPTED INSTRUCTIONS ====================

    /// Evaluate certification policy over encrypted metrics
    ///
    /// Computes (energy <= max_energy) AND (score >= min_score) without
    /// decrypting either operand. Both comparisons always execute - MPC
    /// evaluates every branch, so the verdict leaks nothing about which
    /// threshold failed.
    #[instruction]
    pub fn evaluate_certification(
        metrics_ctxt: Enc<Shared, BuildingMetrics>,
        max_energy: u64,
        min_score: u64,
    ) -> Enc<Mxe, PolicyVerdict> {
        let metrics = metrics_ctxt.to_arcis();

        let energy_ok = metrics.energy_consumption <= max_energy;
        let score_ok = metrics.efficiency_score >= min_score;

        let meets_policy = if energy_ok && score_ok { 1u8 } else { 0u8 };

        // Encrypt to MXE; the verdict stays ciphertext on-chain
        Mxe.from_arcis(PolicyVerdict { meets_policy })
    }

    /// Re-encrypt the verdict to the certification authority's key
    ///
    /// The authority decrypts the result off-chain. Only the verdict
    /// bit is reconstructed - the underlying metrics stay encrypted
    /// forever.
    #[instruction]
    pub fn reveal_verdict(
        verdict_ctxt: Enc<Mxe, PolicyVerdict>,
        authority: Shared,
    ) -> Enc<Shared, u8> {
        let verdict = verdict_ctxt.to_arcis();
        authority.from_arcis(verdict.meets_policy)
    }
}

// ==================== CLIENT-SIDE VALIDATION ====================

/// Range checks applied before metrics are encrypted.
///
/// The circuit cannot reject malformed plaintext without leaking it, so
/// submitters validate locally and the authority's verdict covers the
/// rest.
pub mod validation {
    /// Efficiency scores are percentages.
    pub fn is_valid_efficiency_score(score: u64) -> bool {
        score <= 100
    }

    /// Years outside the registry's accepted range are rejected at
    /// intake.
    pub fn is_valid_construction_year(year: u16) -> bool {
        (1800..=2100).contains(&year)
    }

    /// A zero consumption reading is a metering fault, not a perfect
    /// building.
    pub fn is_valid_energy_consumption(kwh_per_m2: u64) -> bool {
        kwh_per_m2 > 0
    }
}
