/*++

Licensed under the Apache-2.0 license.

File Name:

    resolver.rs

Abstract:

    This file drives FRTS discovery from the boot configuration to a
    resolved DIRT table.

--*/

use crate::*;
use frts_drivers::{cprintln, AccessBackend, FrtsError, HexBytes};
use frts_image_types::{DirtId, DirtTable, FrtsConfig, FrtsImageDescriptor, FrtsMetadata};

/// Progress of FRTS discovery
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrtsState {
    Unconfigured,
    DescriptorValidated,
    MetadataVerified,
    DirtResolved,

    /// A check failed; nothing past this point is trusted
    Failed,
}

impl FrtsState {
    pub fn name(&self) -> &'static str {
        match self {
            FrtsState::Unconfigured => "unconfigured",
            FrtsState::DescriptorValidated => "descriptor validated",
            FrtsState::MetadataVerified => "metadata verified",
            FrtsState::DirtResolved => "dirt resolved",
            FrtsState::Failed => "failed",
        }
    }
}

/// Verified FRTS region and the DIRT table resolved from it
pub struct FrtsResolver<A: AccessBackend> {
    access: A,
    descriptor: FrtsImageDescriptor,
    metadata: FrtsMetadata,
    dirt: DirtTable,
    state: FrtsState,
}

impl<A: AccessBackend> FrtsResolver<A> {
    /// Verify the FRTS region in `config` and resolve its DIRT table using
    /// the CERT variant this firmware is built for
    ///
    /// # Arguments
    ///
    /// * `config` - FRTS configuration from the bootstrap stage
    /// * `env` - Verification environment
    /// * `access` - Access backend; owned by the resolver from here on
    ///
    /// # Returns
    ///
    /// * `None` when FRTS is not configured for this boot
    pub fn construct<Env: FrtsVerificationEnv>(
        config: &FrtsConfig,
        env: &mut Env,
        access: A,
    ) -> FrtsResult<Option<Self>> {
        if !config.is_enabled() {
            return Ok(Self::disabled(env));
        }

        let parser = active_cert_parser()
            .map_err(|err| Self::report_failure(env, FrtsState::Unconfigured, err))?;
        Self::construct_with_parser(config, env, access, parser)
    }

    /// Same as `construct` with an explicit CERT variant parser
    pub fn construct_with_parser<Env: FrtsVerificationEnv>(
        config: &FrtsConfig,
        env: &mut Env,
        access: A,
        parser: &dyn CertVariantParser,
    ) -> FrtsResult<Option<Self>> {
        if !config.is_enabled() {
            return Ok(Self::disabled(env));
        }

        cprintln!("[frts] Resolving with {} entries", parser.name());

        let mut resolver = Self {
            access,
            descriptor: FrtsImageDescriptor::default(),
            metadata: FrtsMetadata::default(),
            dirt: DirtTable::new(),
            state: FrtsState::Unconfigured,
        };

        match resolver.run(config, env, parser) {
            Ok(()) => Ok(Some(resolver)),
            Err(err) => Err(Self::report_failure(env, resolver.state, err)),
        }
    }

    fn disabled<Env: FrtsVerificationEnv>(env: &mut Env) -> Option<Self> {
        cprintln!("[frts] Not configured");
        env.set_boot_status(FrtsBootStatus::Disabled.into());
        None
    }

    fn report_failure<Env: FrtsVerificationEnv>(
        env: &mut Env,
        state: FrtsState,
        err: FrtsError,
    ) -> FrtsError {
        let code = u32::from(err);
        cprintln!(
            "[frts] {} -> {}: 0x{}",
            state.name(),
            FrtsState::Failed.name(),
            HexBytes(&code.to_be_bytes())
        );
        env.report_error(code);
        err
    }

    fn advance<Env: FrtsVerificationEnv>(
        &mut self,
        env: &mut Env,
        state: FrtsState,
        status: FrtsBootStatus,
    ) {
        cprintln!("[frts] {}", state.name());
        self.state = state;
        env.set_boot_status(status.into());
    }

    fn run<Env: FrtsVerificationEnv>(
        &mut self,
        config: &FrtsConfig,
        env: &mut Env,
        parser: &dyn CertVariantParser,
    ) -> FrtsResult<()> {
        let index = FrtsVerifier::new(&*env).select_channel(config, &self.access)?;
        env.set_boot_status(FrtsBootStatus::ConfigAccepted.into());

        if env.enforced_security() {
            FrtsVerifier::new(&*env).verify_secure_access(config)?;
            cprintln!("[frts] Secure access verified");
            env.set_boot_status(FrtsBootStatus::SecureAccessVerified.into());
        }

        self.access.open(index, config)?;

        self.descriptor = FrtsVerifier::new(&*env).verify_descriptor(&mut self.access)?;
        self.advance(
            env,
            FrtsState::DescriptorValidated,
            FrtsBootStatus::DescriptorValidated,
        );

        self.metadata = FrtsVerifier::new(&*env).verify_metadata(&self.descriptor, config.size)?;
        self.advance(
            env,
            FrtsState::MetadataVerified,
            FrtsBootStatus::MetadataVerified,
        );

        let scanner = VdpaScanner::new(parser);
        scanner.load_entries(&self.metadata, &mut self.access)?;
        env.set_boot_status(FrtsBootStatus::VdpaEntriesLoaded.into());

        self.dirt = scanner.resolve(&self.metadata, &mut self.access)?;
        cprintln!(
            "[frts] {} DIRT tables located",
            self.dirt.populated_count() as u32
        );
        self.advance(env, FrtsState::DirtResolved, FrtsBootStatus::DirtResolved);

        Ok(())
    }

    pub fn state(&self) -> FrtsState {
        self.state
    }

    pub fn dirt_table(&self) -> &DirtTable {
        &self.dirt
    }

    pub fn metadata(&self) -> &FrtsMetadata {
        &self.metadata
    }

    /// Cached descriptor bytes
    pub fn descriptor(&self) -> &[u8] {
        self.access.descriptor()
    }

    pub fn access(&self) -> &A {
        &self.access
    }

    /// Cached bytes of table `id`; `None` if the id was not resolved or this
    /// build keeps no buffer for it
    pub fn lookup(&self, id: DirtId) -> Option<&[u8]> {
        self.dirt.get(id)?;
        self.access.table(id)
    }

    /// Fetch table `id` at its resolved location
    ///
    /// Returns the cached bytes without a new transfer when the buffer
    /// already holds the table. If the transfer fails, `lookup` returns
    /// `None` for `id` while `dirt_table` still lists it.
    pub fn fetch(&mut self, id: DirtId) -> FrtsResult<Option<&[u8]>> {
        let Some(entry) = self.dirt.get(id) else {
            return Ok(None);
        };
        self.access
            .fetch_table(&self.metadata, id, entry.offset, entry.size)
    }
}
