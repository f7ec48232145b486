//! Privacy Building Certification - Solana Anchor Program
//!
//! This program keeps a registry of buildings whose energy measurements
//! are encrypted end-to-end. Policy evaluation runs inside the Arcium
//! MXE; only the certification authority can learn the verdict, and the
//! chain never sees a plaintext consumption or efficiency value.
//!
//! Location: programs/privacy-building-certification/src/lib.rs

use anchor_lang::prelude::*;
use arcium_client::idl::arcium::cpi::{accounts::QueueComputation, queue_computation};
use arcium_client::idl::arcium::program::Arcium;
use arcium_client::idl::arcium::types::{ArgumentList, ArgumentRef, CallbackInstruction};
use arcium_client::pda::comp_def_offset;

declare_id!("71tbBcert9fpKHfjtu1LYgY8jfQWuoZtHecDu6F6EPJH");

// ==================== CONSTANTS ====================

/// Seeds for PDA derivation
pub const REGISTRY_SEED: &[u8] = b"registry";
pub const BUILDING_SEED: &[u8] = b"building";
pub const SIGN_SEED: &[u8] = b"sign";
pub const COMPUTATION_OFFSET_SEED: &[u8] = b"computation_offset";

/// Computation definition names (must match certification-circuit)
pub const EVALUATE_CERTIFICATION_COMP: &str = "evaluate_certification";
pub const REVEAL_VERDICT_COMP: &str = "reveal_verdict";

/// Policy applied until the owner updates it: annual consumption in
/// kWh/m² and the minimum efficiency score on the 0-100 scale.
pub const DEFAULT_MAX_ENERGY_THRESHOLD: u64 = 1_000;
pub const DEFAULT_MIN_EFFICIENCY_SCORE: u64 = 70;

// ==================== ENCRYPTED VALUE HANDLES ====================

/// Opaque handle to one Arcium ciphertext shard.
///
/// The handle moves between accounts and computation arguments as raw
/// bytes; no arithmetic, comparison against plaintext, or decryption is
/// available on-chain. The only way to act on the underlying value is
/// to queue a circuit execution.
#[derive(AnchorSerialize, AnchorDeserialize, InitSpace, Clone, Copy, PartialEq, Eq, Debug)]
pub struct CiphertextHandle {
    bytes: [u8; 32],
}

impl CiphertextHandle {
    /// Placeholder for fields that have not received a ciphertext yet.
    pub const ZERO: Self = Self { bytes: [0u8; 32] };

    pub fn new(bytes: [u8; 32]) -> Self {
        Self { bytes }
    }

    /// Raw shard bytes, for building computation arguments.
    pub fn to_bytes(self) -> [u8; 32] {
        self.bytes
    }

    pub fn is_set(&self) -> bool {
        *self != Self::ZERO
    }
}

// ==================== COMPUTATION ARGUMENTS ====================

fn empty_argument_list() -> ArgumentList {
    ArgumentList {
        args: Vec::new(),
        byte_arrays: Vec::new(),
        plaintext_numbers: Vec::new(),
        values_128_bit: Vec::new(),
        accounts: Vec::new(),
    }
}

/// Argument order must match the circuit signature:
/// evaluate_certification(metrics, max_energy, min_score)
fn build_args_for_evaluation(
    building: &BuildingRecord,
    policy: CertificationPolicy,
) -> ArgumentList {
    let mut args = empty_argument_list();

    // Re-encryption key and nonce for the submitter's Enc<Shared, _> input
    args.args
        .push(ArgumentRef::X25519Pubkey(args.byte_arrays.len() as u8));
    args.byte_arrays.push(building.submitter_pubkey);
    args.args
        .push(ArgumentRef::PlaintextU128(args.values_128_bit.len() as u8));
    args.values_128_bit
        .push(u128::from_le_bytes(building.metrics_nonce));

    args.args
        .push(ArgumentRef::EncryptedU64(args.byte_arrays.len() as u8));
    args.byte_arrays.push(building.encrypted_energy.to_bytes());
    args.args
        .push(ArgumentRef::EncryptedU64(args.byte_arrays.len() as u8));
    args.byte_arrays
        .push(building.encrypted_efficiency.to_bytes());

    // Thresholds snapshotted at review start travel as plaintext
    args.args
        .push(ArgumentRef::PlaintextU64(args.plaintext_numbers.len() as u8));
    args.plaintext_numbers.push(policy.max_energy_threshold);
    args.args
        .push(ArgumentRef::PlaintextU64(args.plaintext_numbers.len() as u8));
    args.plaintext_numbers.push(policy.min_efficiency_score);

    args
}

/// Argument order must match reveal_verdict(verdict, authority). The
/// verdict is re-encrypted to the authority's key; it never becomes
/// public on-chain.
fn build_args_for_reveal(
    encrypted_verdict: CiphertextHandle,
    authority_pubkey: [u8; 32],
    reveal_nonce: u128,
) -> ArgumentList {
    let mut args = empty_argument_list();

    args.args
        .push(ArgumentRef::EncryptedU8(args.byte_arrays.len() as u8));
    args.byte_arrays.push(encrypted_verdict.to_bytes());

    args.args
        .push(ArgumentRef::X25519Pubkey(args.byte_arrays.len() as u8));
    args.byte_arrays.push(authority_pubkey);
    args.args
        .push(ArgumentRef::PlaintextU128(args.values_128_bit.len() as u8));
    args.values_128_bit.push(reveal_nonce);

    args
}

// ==================== PROGRAM ====================

#[program]
pub mod privacy_building_certification {
    use super::*;

    /// Create the registry and appoint the certification authority
    pub fn initialize(
        ctx: Context<Initialize>,
        certification_authority: Pubkey,
        mxe_program_id: Pubkey,
    ) -> Result<()> {
        let registry = &mut ctx.accounts.registry;
        registry.init(
            ctx.accounts.owner.key(),
            certification_authority,
            mxe_program_id,
            ctx.bumps.registry,
        )?;

        emit!(RegistryInitialized {
            owner: registry.owner,
            authority: registry.authority,
        });

        Ok(())
    }

    /// Register a building with its public metadata
    ///
    /// Any caller may register. `building_id` must be the next id in
    /// sequence - ids are allocated monotonically and never reused.
    pub fn register_building(
        ctx: Context<RegisterBuilding>,
        building_id: u64,
        street_address: String,
        square_meters: u64,
        construction_year: u16,
    ) -> Result<()> {
        let registry = &mut ctx.accounts.registry;
        let id = registry.allocate_building_id(building_id)?;

        let building = &mut ctx.accounts.building;
        building.id = id;
        building.owner = ctx.accounts.owner.key();
        building.status = CertificationStatus::Registered;
        building.street_address = street_address;
        building.square_meters = square_meters;
        building.construction_year = construction_year;
        building.bump = ctx.bumps.building;

        emit!(BuildingRegistered {
            building_id: id,
            owner: building.owner,
        });

        Ok(())
    }

    /// Submit encrypted energy metrics for a registered building
    ///
    /// Only the building's owner may submit, and only once: the
    /// ciphertext handles are immutable after this call.
    pub fn submit_metrics(
        ctx: Context<SubmitMetrics>,
        building_id: u64,
        encrypted_energy: CiphertextHandle,
        encrypted_efficiency: CiphertextHandle,
        metrics_nonce: [u8; 16],
        submitter_pubkey: [u8; 32],
    ) -> Result<()> {
        ctx.accounts.building.submit_metrics(
            &ctx.accounts.owner.key(),
            encrypted_energy,
            encrypted_efficiency,
            metrics_nonce,
            submitter_pubkey,
        )?;

        emit!(MetricsSubmitted { building_id });

        Ok(())
    }

    /// Begin the certification review for a submitted building
    ///
    /// Authority only. Snapshots the current policy onto the record and
    /// queues the homomorphic evaluation; neither metric is decrypted
    /// on-chain.
    pub fn begin_review(ctx: Context<BeginReview>, building_id: u64) -> Result<()> {
        let registry = &ctx.accounts.registry;
        registry.require_authority(&ctx.accounts.authority.key())?;
        let policy = registry.policy();

        let building = &mut ctx.accounts.building;
        building.begin_review(policy)?;

        let args = build_args_for_evaluation(building, policy);

        let cpi_accounts = QueueComputation {
            signer: ctx.accounts.authority.to_account_info(),
            sign_seed: ctx.accounts.sign_seed.to_account_info(),
            comp: ctx.accounts.computation_account.to_account_info(),
            mxe: ctx.accounts.mxe_account.to_account_info(),
            mempool: ctx.accounts.mempool_account.to_account_info(),
            executing_pool: ctx.accounts.executing_pool.to_account_info(),
            comp_def_acc: ctx.accounts.comp_def_account.to_account_info(),
            cluster: ctx.accounts.cluster_account.to_account_info(),
            pool_account: ctx.accounts.pool_account.to_account_info(),
            system_program: ctx.accounts.system_program.to_account_info(),
            clock: ctx.accounts.clock_account.to_account_info(),
        };

        let signer_seeds: &[&[&[u8]]] = &[&[SIGN_SEED, &[ctx.bumps.sign_seed]]];
        let cpi_ctx = CpiContext::new_with_signer(
            ctx.accounts.arcium_program.to_account_info(),
            cpi_accounts,
            signer_seeds,
        );

        let computation_offset = Clock::get()?.slot as u64;

        queue_computation(
            cpi_ctx,
            computation_offset,
            comp_def_offset(EVALUATE_CERTIFICATION_COMP),
            None,
            args,
            registry.mxe_program_id,
            Vec::<CallbackInstruction>::new(),
            0,
            0,
            0,
        )?;

        msg!(
            "Policy evaluation queued via Arcium MXE for building {}",
            building_id
        );

        emit!(ReviewStarted {
            building_id,
            max_energy_threshold: policy.max_energy_threshold,
            min_efficiency_score: policy.min_efficiency_score,
        });

        Ok(())
    }

    /// Callback from Arcium after evaluate_certification completes
    ///
    /// Stores the encrypted verdict. The record stays UnderReview until
    /// the authority attests the decrypted outcome.
    pub fn evaluate_callback(
        ctx: Context<EvaluateCallback>,
        encrypted_verdict: CiphertextHandle,
        verdict_nonce: [u8; 16],
    ) -> Result<()> {
        ctx.accounts
            .building
            .store_verdict(encrypted_verdict, verdict_nonce)?;

        Ok(())
    }

    /// Queue re-encryption of the verdict to the authority's key
    ///
    /// The reveal output goes to the authority off-chain; the plaintext
    /// verdict bit never appears in shared state.
    pub fn request_verdict_reveal(
        ctx: Context<RequestVerdictReveal>,
        building_id: u64,
        authority_pubkey: [u8; 32],
        reveal_nonce: u128,
    ) -> Result<()> {
        let registry = &ctx.accounts.registry;
        registry.require_authority(&ctx.accounts.authority.key())?;

        let building = &ctx.accounts.building;
        require!(
            building.status == CertificationStatus::UnderReview,
            CertificationError::InvalidState
        );
        require!(
            building.encrypted_verdict.is_set(),
            CertificationError::InvalidState
        );

        let args =
            build_args_for_reveal(building.encrypted_verdict, authority_pubkey, reveal_nonce);

        let cpi_accounts = QueueComputation {
            signer: ctx.accounts.authority.to_account_info(),
            sign_seed: ctx.accounts.sign_seed.to_account_info(),
            comp: ctx.accounts.computation_account.to_account_info(),
            mxe: ctx.accounts.mxe_account.to_account_info(),
            mempool: ctx.accounts.mempool_account.to_account_info(),
            executing_pool: ctx.accounts.executing_pool.to_account_info(),
            comp_def_acc: ctx.accounts.comp_def_account.to_account_info(),
            cluster: ctx.accounts.cluster_account.to_account_info(),
            pool_account: ctx.accounts.pool_account.to_account_info(),
            system_program: ctx.accounts.system_program.to_account_info(),
            clock: ctx.accounts.clock_account.to_account_info(),
        };

        let signer_seeds: &[&[&[u8]]] = &[&[SIGN_SEED, &[ctx.bumps.sign_seed]]];
        let cpi_ctx = CpiContext::new_with_signer(
            ctx.accounts.arcium_program.to_account_info(),
            cpi_accounts,
            signer_seeds,
        );

        let computation_offset = Clock::get()?.slot as u64;

        queue_computation(
            cpi_ctx,
            computation_offset,
            comp_def_offset(REVEAL_VERDICT_COMP),
            None,
            args,
            registry.mxe_program_id,
            Vec::<CallbackInstruction>::new(),
            0,
            0,
            0,
        )?;

        emit!(VerdictRevealRequested { building_id });

        Ok(())
    }

    /// Finalize a certification with the authority's attested outcome
    ///
    /// The authority decrypts the verdict off-chain and asserts the
    /// result here; the signed instruction is the attestation. Terminal:
    /// a finalized record accepts no further transitions.
    pub fn finalize_certification(
        ctx: Context<FinalizeCertification>,
        building_id: u64,
        certified: bool,
    ) -> Result<()> {
        let registry = &mut ctx.accounts.registry;
        registry.require_authority(&ctx.accounts.authority.key())?;

        ctx.accounts.building.finalize(certified)?;
        if certified {
            registry.record_certified()?;
        }

        emit!(CertificationFinalized {
            building_id,
            certified,
        });

        Ok(())
    }

    /// Hand the certification authority role to a new identity
    pub fn transfer_authority(
        ctx: Context<TransferAuthority>,
        new_authority: Pubkey,
    ) -> Result<()> {
        let registry = &mut ctx.accounts.registry;
        let previous_authority =
            registry.transfer_authority(&ctx.accounts.owner.key(), new_authority)?;

        emit!(AuthorityChanged {
            previous_authority,
            new_authority,
        });

        Ok(())
    }

    /// Update the certification thresholds
    ///
    /// Owner only. Reviews already begun keep the thresholds they
    /// snapshotted; the new policy applies from the next begin_review.
    pub fn update_policy(
        ctx: Context<UpdatePolicy>,
        max_energy_threshold: u64,
        min_efficiency_score: u64,
    ) -> Result<()> {
        let registry = &mut ctx.accounts.registry;
        registry.update_policy(
            &ctx.accounts.owner.key(),
            max_energy_threshold,
            min_efficiency_score,
        )?;

        emit!(PolicyUpdated {
            max_energy_threshold,
            min_efficiency_score,
        });

        Ok(())
    }

    /// Initialize computation definitions (called once at deployment)
    pub fn init_comp_def(_ctx: Context<InitCompDef>, _comp_def_data: Vec<u8>) -> Result<()> {
        // This is handled by Arcium SDK during deployment
        // Included here for completeness
        Ok(())
    }

    /// Initialize the computation offset PDA (one-time setup)
    pub fn init_computation_offset(ctx: Context<InitComputationOffset>) -> Result<()> {
        let state = &mut ctx.accounts.computation_offset_account;
        state.bump = ctx.bumps.computation_offset_account;
        Ok(())
    }

    // ==================== DEV MODE INSTRUCTIONS ====================
    // These bypass Arcium MXE CPI for localnet testing. All other logic
    // (authority checks, state transitions, counters) remains identical
    // to production instructions. Remove before mainnet deployment.

    /// Dev mode: Begin a review without queueing the evaluation circuit
    pub fn dev_begin_review(ctx: Context<DevBeginReview>, building_id: u64) -> Result<()> {
        let registry = &ctx.accounts.registry;
        registry.require_authority(&ctx.accounts.authority.key())?;
        let policy = registry.policy();

        ctx.accounts.building.begin_review(policy)?;

        emit!(ReviewStarted {
            building_id,
            max_energy_threshold: policy.max_energy_threshold,
            min_efficiency_score: policy.min_efficiency_score,
        });

        Ok(())
    }

    /// Dev mode: Store a verdict directly (simulates the MXE callback)
    pub fn dev_store_verdict(
        ctx: Context<DevStoreVerdict>,
        _building_id: u64,
        encrypted_verdict: CiphertextHandle,
        verdict_nonce: [u8; 16],
    ) -> Result<()> {
        let registry = &ctx.accounts.registry;
        registry.require_authority(&ctx.accounts.authority.key())?;

        ctx.accounts
            .building
            .store_verdict(encrypted_verdict, verdict_nonce)?;

        Ok(())
    }
}

// ==================== ACCOUNT STRUCTURES ====================

#[derive(Accounts)]
pub struct Initialize<'info> {
    #[account(mut)]
    pub owner: Signer<'info>,

    #[account(
        init,
        payer = owner,
        space = 8 + RegistryState::INIT_SPACE,
        seeds = [REGISTRY_SEED],
        bump
    )]
    pub registry: Account<'info, RegistryState>,

    pub system_program: Program<'info, System>,
}

#[derive(Accounts)]
#[instruction(building_id: u64)]
pub struct RegisterBuilding<'info> {
    #[account(mut)]
    pub owner: Signer<'info>,

    #[account(
        mut,
        seeds = [REGISTRY_SEED],
        bump = registry.bump
    )]
    pub registry: Account<'info, RegistryState>,

    #[account(
        init,
        payer = owner,
        space = 8 + BuildingRecord::INIT_SPACE,
        seeds = [BUILDING_SEED, building_id.to_le_bytes().as_ref()],
        bump
    )]
    pub building: Account<'info, BuildingRecord>,

    pub system_program: Program<'info, System>,
}

#[derive(Accounts)]
#[instruction(building_id: u64)]
pub struct SubmitMetrics<'info> {
    pub owner: Signer<'info>,

    #[account(
        mut,
        seeds = [BUILDING_SEED, building_id.to_le_bytes().as_ref()],
        bump = building.bump,
        constraint = building.id == building_id @ CertificationError::BuildingNotFound
    )]
    pub building: Account<'info, BuildingRecord>,
}

#[derive(Accounts)]
#[instruction(building_id: u64)]
pub struct BeginReview<'info> {
    #[account(mut)]
    pub authority: Signer<'info>,

    #[account(
        seeds = [REGISTRY_SEED],
        bump = registry.bump
    )]
    pub registry: Account<'info, RegistryState>,

    #[account(
        mut,
        seeds = [BUILDING_SEED, building_id.to_le_bytes().as_ref()],
        bump = building.bump,
        constraint = building.id == building_id @ CertificationError::BuildingNotFound
    )]
    pub building: Account<'info, BuildingRecord>,

    /// CHECK: Sign PDA for Arcium CPI
    #[account(
        seeds = [SIGN_SEED],
        bump
    )]
    pub sign_seed: AccountInfo<'info>,

    // Arcium accounts
    pub arcium_program: Program<'info, Arcium>,
    /// CHECK: MXE account
    pub mxe_account: AccountInfo<'info>,
    /// CHECK: Cluster account
    pub cluster_account: AccountInfo<'info>,
    /// CHECK: Fee pool
    pub pool_account: AccountInfo<'info>,
    /// CHECK: Clock account
    pub clock_account: AccountInfo<'info>,
    /// CHECK: Mempool
    pub mempool_account: AccountInfo<'info>,
    /// CHECK: Executing pool
    pub executing_pool: AccountInfo<'info>,
    /// CHECK: Computation account
    #[account(mut)]
    pub computation_account: AccountInfo<'info>,
    /// CHECK: Comp def account
    pub comp_def_account: AccountInfo<'info>,
    #[account(
        mut,
        seeds = [COMPUTATION_OFFSET_SEED],
        bump = computation_offset_account.bump
    )]
    pub computation_offset_account: Account<'info, ComputationOffsetState>,

    pub system_program: Program<'info, System>,
}

#[derive(Accounts)]
pub struct EvaluateCallback<'info> {
    #[account(mut)]
    pub building: Account<'info, BuildingRecord>,

    /// CHECK: Sign PDA, proves this callback was invoked via Arcium CPI
    #[account(
        seeds = [SIGN_SEED],
        bump,
        signer
    )]
    pub sign_seed: AccountInfo<'info>,
}

#[derive(Accounts)]
#[instruction(building_id: u64)]
pub struct RequestVerdictReveal<'info> {
    #[account(mut)]
    pub authority: Signer<'info>,

    #[account(
        seeds = [REGISTRY_SEED],
        bump = registry.bump
    )]
    pub registry: Account<'info, RegistryState>,

    #[account(
        seeds = [BUILDING_SEED, building_id.to_le_bytes().as_ref()],
        bump = building.bump,
        constraint = building.id == building_id @ CertificationError::BuildingNotFound
    )]
    pub building: Account<'info, BuildingRecord>,

    /// CHECK: Sign PDA for Arcium CPI
    #[account(
        seeds = [SIGN_SEED],
        bump
    )]
    pub sign_seed: AccountInfo<'info>,

    // Arcium accounts (same as BeginReview)
    pub arcium_program: Program<'info, Arcium>,
    /// CHECK: MXE account
    pub mxe_account: AccountInfo<'info>,
    /// CHECK: Cluster account
    pub cluster_account: AccountInfo<'info>,
    /// CHECK: Fee pool
    pub pool_account: AccountInfo<'info>,
    /// CHECK: Clock account
    pub clock_account: AccountInfo<'info>,
    /// CHECK: Mempool
    pub mempool_account: AccountInfo<'info>,
    /// CHECK: Executing pool
    pub executing_pool: AccountInfo<'info>,
    /// CHECK: Computation account
    #[account(mut)]
    pub computation_account: AccountInfo<'info>,
    /// CHECK: Comp def account
    pub comp_def_account: AccountInfo<'info>,
    #[account(
        mut,
        seeds = [COMPUTATION_OFFSET_SEED],
        bump = computation_offset_account.bump
    )]
    pub computation_offset_account: Account<'info, ComputationOffsetState>,

    pub system_program: Program<'info, System>,
}

#[derive(Accounts)]
#[instruction(building_id: u64)]
pub struct FinalizeCertification<'info> {
    pub authority: Signer<'info>,

    #[account(
        mut,
        seeds = [REGISTRY_SEED],
        bump = registry.bump
    )]
    pub registry: Account<'info, RegistryState>,

    #[account(
        mut,
        seeds = [BUILDING_SEED, building_id.to_le_bytes().as_ref()],
        bump = building.bump,
        constraint = building.id == building_id @ CertificationError::BuildingNotFound
    )]
    pub building: Account<'info, BuildingRecord>,
}

#[derive(Accounts)]
pub struct TransferAuthority<'info> {
    pub owner: Signer<'info>,

    #[account(
        mut,
        seeds = [REGISTRY_SEED],
        bump = registry.bump
    )]
    pub registry: Account<'info, RegistryState>,
}

#[derive(Accounts)]
pub struct UpdatePolicy<'info> {
    pub owner: Signer<'info>,

    #[account(
        mut,
        seeds = [REGISTRY_SEED],
        bump = registry.bump
    )]
    pub registry: Account<'info, RegistryState>,
}

#[derive(Accounts)]
pub struct InitCompDef<'info> {
    #[account(mut)]
    pub authority: Signer<'info>,
    pub system_program: Program<'info, System>,
}

#[derive(Accounts)]
pub struct InitComputationOffset<'info> {
    #[account(mut)]
    pub payer: Signer<'info>,

    #[account(
        init,
        payer = payer,
        space = 8 + ComputationOffsetState::INIT_SPACE,
        seeds = [COMPUTATION_OFFSET_SEED],
        bump
    )]
    pub computation_offset_account: Account<'info, ComputationOffsetState>,

    pub system_program: Program<'info, System>,
}

// ==================== DEV MODE ACCOUNT STRUCTURES ====================

#[derive(Accounts)]
#[instruction(building_id: u64)]
pub struct DevBeginReview<'info> {
    pub authority: Signer<'info>,

    #[account(
        seeds = [REGISTRY_SEED],
        bump = registry.bump
    )]
    pub registry: Account<'info, RegistryState>,

    #[account(
        mut,
        seeds = [BUILDING_SEED, building_id.to_le_bytes().as_ref()],
        bump = building.bump,
        constraint = building.id == building_id @ CertificationError::BuildingNotFound
    )]
    pub building: Account<'info, BuildingRecord>,
}

#[derive(Accounts)]
#[instruction(building_id: u64)]
pub struct DevStoreVerdict<'info> {
    pub authority: Signer<'info>,

    #[account(
        seeds = [REGISTRY_SEED],
        bump = registry.bump
    )]
    pub registry: Account<'info, RegistryState>,

    #[account(
        mut,
        seeds = [BUILDING_SEED, building_id.to_le_bytes().as_ref()],
        bump = building.bump,
        constraint = building.id == building_id @ CertificationError::BuildingNotFound
    )]
    pub building: Account<'info, BuildingRecord>,
}

// ==================== STATE ACCOUNTS ====================

#[account]
#[derive(InitSpace)]
pub struct RegistryState {
    pub owner: Pubkey,
    pub authority: Pubkey,
    pub mxe_program_id: Pubkey,
    pub max_energy_threshold: u64,
    pub min_efficiency_score: u64,
    pub next_building_id: u64,
    pub total_buildings: u64,
    pub certified_count: u64,
    pub bump: u8,
}

impl RegistryState {
    pub fn init(
        &mut self,
        owner: Pubkey,
        authority: Pubkey,
        mxe_program_id: Pubkey,
        bump: u8,
    ) -> Result<()> {
        require!(owner != Pubkey::default(), CertificationError::InvalidAddress);
        require!(
            authority != Pubkey::default(),
            CertificationError::InvalidAddress
        );

        self.owner = owner;
        self.authority = authority;
        self.mxe_program_id = mxe_program_id;
        self.max_energy_threshold = DEFAULT_MAX_ENERGY_THRESHOLD;
        self.min_efficiency_score = DEFAULT_MIN_EFFICIENCY_SCORE;
        self.next_building_id = 0;
        self.total_buildings = 0;
        self.certified_count = 0;
        self.bump = bump;

        Ok(())
    }

    pub fn require_owner(&self, caller: &Pubkey) -> Result<()> {
        require!(*caller == self.owner, CertificationError::Unauthorized);
        Ok(())
    }

    pub fn require_authority(&self, caller: &Pubkey) -> Result<()> {
        require!(*caller == self.authority, CertificationError::Unauthorized);
        Ok(())
    }

    pub fn transfer_authority(&mut self, caller: &Pubkey, new_authority: Pubkey) -> Result<Pubkey> {
        self.require_owner(caller)?;
        require!(
            new_authority != Pubkey::default(),
            CertificationError::InvalidAddress
        );

        let previous_authority = self.authority;
        self.authority = new_authority;
        Ok(previous_authority)
    }

    pub fn update_policy(
        &mut self,
        caller: &Pubkey,
        max_energy_threshold: u64,
        min_efficiency_score: u64,
    ) -> Result<()> {
        self.require_owner(caller)?;
        self.max_energy_threshold = max_energy_threshold;
        self.min_efficiency_score = min_efficiency_score;
        Ok(())
    }

    /// Allocate the next building id. `requested` must equal the current
    /// counter: the client derives the record PDA from it, so a stale id
    /// is rejected rather than silently remapped.
    pub fn allocate_building_id(&mut self, requested: u64) -> Result<u64> {
        require!(
            requested == self.next_building_id,
            CertificationError::InvalidBuildingId
        );

        self.next_building_id = self
            .next_building_id
            .checked_add(1)
            .ok_or(CertificationError::Overflow)?;
        self.total_buildings = self
            .total_buildings
            .checked_add(1)
            .ok_or(CertificationError::Overflow)?;

        Ok(requested)
    }

    /// Every certified building was allocated first, so certified_count
    /// can never pass total_buildings.
    pub fn record_certified(&mut self) -> Result<()> {
        self.certified_count = self
            .certified_count
            .checked_add(1)
            .ok_or(CertificationError::Overflow)?;
        Ok(())
    }

    pub fn policy(&self) -> CertificationPolicy {
        CertificationPolicy {
            max_energy_threshold: self.max_energy_threshold,
            min_efficiency_score: self.min_efficiency_score,
        }
    }

    pub fn snapshot(&self) -> RegistrySnapshot {
        RegistrySnapshot {
            total_buildings: self.total_buildings,
            certified_count: self.certified_count,
        }
    }
}

#[account]
#[derive(InitSpace)]
pub struct BuildingRecord {
    pub id: u64,
    pub owner: Pubkey,
    pub status: CertificationStatus,
    #[max_len(100)]
    pub street_address: String,
    pub square_meters: u64,
    pub construction_year: u16,
    pub encrypted_energy: CiphertextHandle,
    pub encrypted_efficiency: CiphertextHandle,
    pub metrics_nonce: [u8; 16],
    pub submitter_pubkey: [u8; 32],
    pub reviewed_max_energy: u64,
    pub reviewed_min_score: u64,
    pub encrypted_verdict: CiphertextHandle,
    pub verdict_nonce: [u8; 16],
    pub bump: u8,
}

impl BuildingRecord {
    /// Registered -> Submitted. Owner only; ciphertexts are written
    /// exactly once.
    pub fn submit_metrics(
        &mut self,
        caller: &Pubkey,
        encrypted_energy: CiphertextHandle,
        encrypted_efficiency: CiphertextHandle,
        metrics_nonce: [u8; 16],
        submitter_pubkey: [u8; 32],
    ) -> Result<()> {
        require!(*caller == self.owner, CertificationError::Unauthorized);
        require!(
            self.status == CertificationStatus::Registered,
            CertificationError::InvalidState
        );

        self.encrypted_energy = encrypted_energy;
        self.encrypted_efficiency = encrypted_efficiency;
        self.metrics_nonce = metrics_nonce;
        self.submitter_pubkey = submitter_pubkey;
        self.status = CertificationStatus::Submitted;

        Ok(())
    }

    /// Submitted -> UnderReview. The policy in force is snapshotted onto
    /// the record; later policy updates do not touch this review.
    pub fn begin_review(&mut self, policy: CertificationPolicy) -> Result<()> {
        require!(
            self.status == CertificationStatus::Submitted,
            CertificationError::InvalidState
        );

        self.reviewed_max_energy = policy.max_energy_threshold;
        self.reviewed_min_score = policy.min_efficiency_score;
        self.status = CertificationStatus::UnderReview;

        Ok(())
    }

    pub fn store_verdict(
        &mut self,
        encrypted_verdict: CiphertextHandle,
        verdict_nonce: [u8; 16],
    ) -> Result<()> {
        require!(
            self.status == CertificationStatus::UnderReview,
            CertificationError::InvalidState
        );

        self.encrypted_verdict = encrypted_verdict;
        self.verdict_nonce = verdict_nonce;

        Ok(())
    }

    /// UnderReview -> Certified | Rejected. Terminal: a second call
    /// fails and leaves the record untouched.
    pub fn finalize(&mut self, certified: bool) -> Result<()> {
        require!(
            self.status == CertificationStatus::UnderReview,
            CertificationError::InvalidState
        );

        self.status = if certified {
            CertificationStatus::Certified
        } else {
            CertificationStatus::Rejected
        };

        Ok(())
    }

    /// Public projection of the record. Carries no ciphertext bytes.
    pub fn public_view(&self) -> BuildingPublicView {
        BuildingPublicView {
            id: self.id,
            owner: self.owner,
            status: self.status,
            street_address: self.street_address.clone(),
            square_meters: self.square_meters,
            construction_year: self.construction_year,
            metrics_submitted: self.encrypted_energy.is_set()
                && self.encrypted_efficiency.is_set(),
        }
    }
}

#[account]
#[derive(InitSpace)]
pub struct ComputationOffsetState {
    pub bump: u8,
}

#[derive(AnchorSerialize, AnchorDeserialize, InitSpace, Clone, Copy, PartialEq, Eq, Debug)]
pub enum CertificationStatus {
    Registered,
    Submitted,
    UnderReview,
    Certified,
    Rejected,
}

// ==================== PUBLIC VIEWS ====================

/// Thresholds in force for a review.
#[derive(AnchorSerialize, AnchorDeserialize, Clone, Copy, PartialEq, Eq, Debug)]
pub struct CertificationPolicy {
    pub max_energy_threshold: u64,
    pub min_efficiency_score: u64,
}

/// Running public counters, readable by anyone.
#[derive(AnchorSerialize, AnchorDeserialize, Clone, Copy, PartialEq, Eq, Debug)]
pub struct RegistrySnapshot {
    pub total_buildings: u64,
    pub certified_count: u64,
}

/// What non-authority callers see of a building.
#[derive(AnchorSerialize, AnchorDeserialize, Clone, PartialEq, Eq, Debug)]
pub struct BuildingPublicView {
    pub id: u64,
    pub owner: Pubkey,
    pub status: CertificationStatus,
    pub street_address: String,
    pub square_meters: u64,
    pub construction_year: u16,
    pub metrics_submitted: bool,
}

// ==================== EVENTS ====================

#[event]
pub struct RegistryInitialized {
    pub owner: Pubkey,
    pub authority: Pubkey,
}

#[event]
pub struct BuildingRegistered {
    pub building_id: u64,
    pub owner: Pubkey,
}

#[event]
pub struct MetricsSubmitted {
    pub building_id: u64,
}

#[event]
pub struct ReviewStarted {
    pub building_id: u64,
    pub max_energy_threshold: u64,
    pub min_efficiency_score: u64,
}

#[event]
pub struct VerdictRevealRequested {
    pub building_id: u64,
}

#[event]
pub struct CertificationFinalized {
    pub building_id: u64,
    pub certified: bool,
}

#[event]
pub struct AuthorityChanged {
    pub previous_authority: Pubkey,
    pub new_authority: Pubkey,
}

#[event]
pub struct PolicyUpdated {
    pub max_energy_threshold: u64,
    pub min_efficiency_score: u64,
}

// ==================== ERRORS ====================

#[error_code]
pub enum CertificationError {
    #[msg("Caller lacks the required role")]
    Unauthorized,
    #[msg("The zero address is not a valid identity")]
    InvalidAddress,
    #[msg("Building does not exist")]
    BuildingNotFound,
    #[msg("Operation not permitted in the building's current status")]
    InvalidState,
    #[msg("Building id does not match the next id in sequence")]
    InvalidBuildingId,
    #[msg("Counter arithmetic overflow")]
    Overflow,
}

// ==================== TESTS ====================
