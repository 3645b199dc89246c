// Licensed under the Apache-2.0 license

use frts_drivers::*;
use frts_image_types::*;
use frts_image_verify::*;

const WINDOW_BASE: u64 = 0x20_0000;

struct FuzzEnv {
    enforced: bool,
    window_size: u64,
}

impl FrtsVerificationEnv for FuzzEnv {
    fn enforced_security(&self) -> bool {
        self.enforced
    }

    fn wpr_region(&self, _wpr_id: WprId) -> FrtsResult<WprRegion> {
        Ok(WprRegion {
            offset: WINDOW_BASE,
            size: self.window_size,
        })
    }

    fn wpr_read_secure(&self, _wpr_id: WprId) -> FrtsResult<bool> {
        Ok(true)
    }

    fn set_boot_status(&mut self, _status: u32) {}

    fn report_error(&mut self, _code: u32) {}
}

struct FuzzDma<'a> {
    window: &'a [u8],
}

impl DmaEngine for FuzzDma<'_> {
    fn check_read_access(&self, _index: DmaIndex, _addr: u64, _size: u64) -> FrtsResult<()> {
        Ok(())
    }

    fn read(&mut self, _index: DmaIndex, addr: u64, dst: &mut [u8]) -> FrtsResult<()> {
        // The access layer must never leave the window
        let start = (addr - WINDOW_BASE) as usize;
        dst.copy_from_slice(&self.window[start..start + dst.len()]);
        Ok(())
    }
}

pub fn harness(data: &[u8], enforced: bool) {
    if data.is_empty() || data.len() as u64 > memory_layout::FRTS_MAX_SIZE {
        return;
    }

    let config = FrtsConfig {
        version: FrtsConfigVersion::V1,
        media_type: FrtsMediaType::FrameBuffer.into(),
        wpr_id: WprId::WPR2,
        offset: WINDOW_BASE,
        size: data.len() as u64,
    };
    let mut env = FuzzEnv {
        enforced,
        window_size: config.size,
    };
    let Ok(access) = DmaAccess::with_default_layout(FuzzDma { window: data }) else {
        return;
    };

    let Ok(Some(mut resolver)) = FrtsResolver::construct(&config, &mut env, access) else {
        return;
    };

    let metadata = *resolver.metadata();
    let entries: Vec<(DirtId, DirtEntry)> = resolver.dirt_table().iter().collect();
    for (id, entry) in entries {
        if let Some(table) = resolver.fetch(id).unwrap() {
            assert_eq!(table.len(), entry.size as usize);
            assert!(entry.offset as u64 + entry.size as u64 <= metadata.image_size as u64);
        }
    }
}
