use meter_core::{MeterError, Result};

/// Page counters from the VM statistics interface.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VmStatistics {
    pub active:     u64,
    pub inactive:   u64,
    pub wired:      u64,
    pub compressed: u64,
    /// Bytes per page.
    pub page_size:  u64,
}

impl VmStatistics {
    /// `(active + inactive + wired + compressed) × page_size`.
    pub fn used_bytes(&self) -> u64 {
        (self.active + self.inactive + self.wired + self.compressed) * self.page_size
    }
}

/// Build page counters from `/proc/meminfo`.
///
/// meminfo reports kB, so the "page" here is 1 KiB.  Wired memory is the
/// `Unevictable` list (which already holds mlocked pages) and compressed
/// memory is `Zswap`; both may be absent on older kernels and count as zero.
pub fn parse_meminfo(raw: &str) -> Result<VmStatistics> {
    let field = |key: &str| -> Option<u64> {
        raw.lines()
            .find_map(|l| l.strip_prefix(key)?.strip_prefix(':'))
            .and_then(|rest| rest.split_whitespace().next())
            .and_then(|kb| kb.parse().ok())
    };
    let required = |key: &'static str| {
        field(key).ok_or_else(|| MeterError::query("memory", format!("no {key} in /proc/meminfo")))
    };

    Ok(VmStatistics {
        active:     required("Active")?,
        inactive:   required("Inactive")?,
        wired:      field("Unevictable").unwrap_or(0),
        compressed: field("Zswap").unwrap_or(0),
        page_size:  1024,
    })
}

/// Read the host's page counters.
#[cfg(target_os = "linux")]
pub fn read_vm_statistics() -> Result<VmStatistics> {
    let raw = std::fs::read_to_string("/proc/meminfo")
        .map_err(|e| MeterError::query("memory", format!("/proc/meminfo: {e}")))?;
    parse_meminfo(&raw)
}

#[cfg(not(target_os = "linux"))]
pub fn read_vm_statistics() -> Result<VmStatistics> {
    Err(MeterError::query("memory", "page counters are not available on this platform"))
}

/// Memory in use against installed physical memory.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MemoryReading {
    pub used_bytes:  u64,
    pub total_bytes: u64,
}

impl MemoryReading {
    pub fn from_vm(vm: &VmStatistics, total_bytes: u64) -> Self {
        Self {
            used_bytes: vm.used_bytes(),
            total_bytes,
        }
    }

    /// `used / total × 100`, or `None` when the total is unknown.
    pub fn usage_percent(&self) -> Option<f64> {
        if self.total_bytes == 0 {
            return None;
        }
        Some(self.used_bytes as f64 * 100.0 / self.total_bytes as f64)
    }
}

/// Format a byte count as a human-readable string (e.g. `"7.3 GiB"`).
pub fn format_bytes(bytes: u64) -> String {
    const GIB: u64 = 1 << 30;
    const MIB: u64 = 1 << 20;
    const KIB: u64 = 1 << 10;

    if bytes >= GIB {
        format!("{:.1} GiB", bytes as f64 / GIB as f64)
    } else if bytes >= MIB {
        format!("{:.1} MiB", bytes as f64 / MIB as f64)
    } else if bytes >= KIB {
        format!("{:.1} KiB", bytes as f64 / KIB as f64)
    } else {
        format!("{bytes} B")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn used_bytes_sums_counted_pages() {
        let vm = VmStatistics {
            active:     100,
            inactive:   50,
            wired:      50,
            compressed: 0,
            page_size:  4096,
        };
        assert_eq!(vm.used_bytes(), 200 * 4096);

        let reading = MemoryReading::from_vm(&vm, 4096 * 1000);
        assert_eq!(reading.usage_percent(), Some(20.0));
    }

    #[test]
    fn parses_meminfo_counters() {
        const MEMINFO: &str = "MemTotal:       16277104 kB\n\
                               MemFree:         1927632 kB\n\
                               Active(anon):    3981044 kB\n\
                               Active:          6502404 kB\n\
                               Inactive:        5320236 kB\n\
                               Unevictable:       84412 kB\n\
                               Mlocked:           27440 kB\n\
                               Zswap:             10240 kB\n";
        let vm = parse_meminfo(MEMINFO).unwrap();
        assert_eq!(
            vm,
            VmStatistics {
                active:     6502404,
                inactive:   5320236,
                wired:      84412,
                compressed: 10240,
                page_size:  1024,
            }
        );
        assert_eq!(vm.used_bytes(), (6502404 + 5320236 + 84412 + 10240) * 1024);
    }

    #[test]
    fn optional_meminfo_fields_default_to_zero() {
        let vm = parse_meminfo("Active: 10 kB\nInactive: 5 kB\n").unwrap();
        assert_eq!((vm.wired, vm.compressed), (0, 0));
        assert_eq!(vm.used_bytes(), 15 * 1024);
    }

    #[test]
    fn meminfo_without_active_is_an_error() {
        let err = parse_meminfo("MemTotal: 100 kB\nInactive: 5 kB\n").unwrap_err();
        assert!(matches!(err, MeterError::OsQuery { query: "memory", .. }));
    }

    #[test]
    fn unknown_total_has_no_percentage() {
        let reading = MemoryReading { used_bytes: 10, total_bytes: 0 };
        assert_eq!(reading.usage_percent(), None);
    }

    #[test]
    fn format_bytes_gib() {
        assert_eq!(format_bytes(8 * 1024 * 1024 * 1024), "8.0 GiB");
    }

    #[test]
    fn format_bytes_mib() {
        assert_eq!(format_bytes(512 * 1024 * 1024), "512.0 MiB");
    }

    #[test]
    fn format_bytes_zero() {
        assert_eq!(format_bytes(0), "0 B");
    }
}
