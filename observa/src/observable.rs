//! Observable identifiers and the compiled-in observable table.
//!
//! Every metric the monitoring subsystem knows about occupies one index in
//! `[0, OBSERVABLE_COUNT)`. The first [`OB_SPARE`] indices are built in and
//! described by [`BUILTIN_OBSERVABLES`]; the remaining indices are extension
//! slots that a descriptor file may define at runtime.
//!
//! ```text
//! 0                         OB_SPARE                  OBSERVABLE_COUNT
//! ├── built-in (immutable) ──┼── extension (descriptor) ──┤
//! ```

use std::fmt;

use crate::error::SlotError;

/// Total number of observable slots, built-in and extension.
pub const OBSERVABLE_COUNT: usize = 100;

/// Index of the first extension slot; also the number of built-in slots.
pub const OB_SPARE: usize = 64;

/// Number of extension slots available to a descriptor file.
pub const EXTENSION_COUNT: usize = OBSERVABLE_COUNT - OB_SPARE;

/// Typed index of one observable.
///
/// An `ObservableId` can only be constructed for an index inside
/// `[0, OBSERVABLE_COUNT)`, so registry lookups never need a bounds check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ObservableId(usize);

impl ObservableId {
    /// Creates an id for `index`.
    ///
    /// # Errors
    ///
    /// Returns [`SlotError::IndexOutOfRange`] if `index >= OBSERVABLE_COUNT`.
    pub fn new(index: usize) -> Result<Self, SlotError> {
        if index < OBSERVABLE_COUNT {
            Ok(Self(index))
        } else {
            Err(SlotError::IndexOutOfRange {
                index,
                max: OBSERVABLE_COUNT,
            })
        }
    }

    /// Returns the id of the extension slot at `offset` past [`OB_SPARE`].
    ///
    /// # Errors
    ///
    /// Returns [`SlotError::IndexOutOfRange`] if the offset runs past the
    /// extension range.
    pub fn extension(offset: usize) -> Result<Self, SlotError> {
        Self::new(OB_SPARE + offset)
    }

    /// The raw index.
    pub fn index(self) -> usize {
        self.0
    }

    /// Whether this id falls in the compiled-in range.
    pub fn is_builtin(self) -> bool {
        self.0 < OB_SPARE
    }

    /// Offset into the extension range, or `None` for built-ins.
    pub fn extension_offset(self) -> Option<usize> {
        self.0.checked_sub(OB_SPARE)
    }

    /// Iterates over every observable id in index order.
    pub fn all() -> impl Iterator<Item = Self> {
        (0..OBSERVABLE_COUNT).map(Self)
    }
}

impl TryFrom<usize> for ObservableId {
    type Error = SlotError;

    fn try_from(index: usize) -> Result<Self, Self::Error> {
        Self::new(index)
    }
}

impl fmt::Display for ObservableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A compiled-in observable: name, description, and units.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuiltinObservable {
    /// Short metric name.
    pub name: &'static str,
    /// Human-readable description.
    pub description: &'static str,
    /// Unit of measurement.
    pub units: &'static str,
}

const fn builtin(
    name: &'static str,
    description: &'static str,
    units: &'static str,
) -> BuiltinObservable {
    BuiltinObservable {
        name,
        description,
        units,
    }
}

/// The compiled-in observables, indexed by [`ObservableId`].
pub static BUILTIN_OBSERVABLES: [BuiltinObservable; OB_SPARE] = [
    builtin(
        "users",
        "Users with active processes, including system users",
        "average users per 2.5 mins",
    ),
    builtin("rootprocs", "Sum privileged system processes", "processes"),
    builtin("otherprocs", "Sum non-privileged process", "processes"),
    builtin("diskfree", "Free disk on / partition", "percent"),
    builtin("loadavg", "Kernel load average utilization", "jobs"),
    builtin("netbiosns_in", "netbios name lookups (in)", "connections"),
    builtin("netbiosns_out", "netbios name lookups (out)", "connections"),
    builtin("netbiosdgm_in", "netbios name datagrams (in)", "connections"),
    builtin("netbiosdgm_out", "netbios name datagrams (out)", "connections"),
    builtin("netbiosssn_in", "netbios name sessions (in)", "connections"),
    builtin("netbiosssn_out", "netbios name sessions (out)", "connections"),
    builtin("imap_in", "IMAP mail client sessions (in)", "connections"),
    builtin("imap_out", "IMAP mail client sessions (out)", "connections"),
    builtin("cfengine_in", "Configuration agent connections (in)", "connections"),
    builtin("cfengine_out", "Configuration agent connections (out)", "connections"),
    builtin("nfsd_in", "nfs connections (in)", "connections"),
    builtin("nfsd_out", "nfs connections (out)", "connections"),
    builtin("smtp_in", "smtp connections (in)", "connections"),
    builtin("smtp_out", "smtp connections (out)", "connections"),
    builtin("www_in", "www connections (in)", "connections"),
    builtin("www_out", "www connections (out)", "connections"),
    builtin("ftp_in", "ftp connections (in)", "connections"),
    builtin("ftp_out", "ftp connections (out)", "connections"),
    builtin("ssh_in", "ssh connections (in)", "connections"),
    builtin("ssh_out", "ssh connections (out)", "connections"),
    builtin("wwws_in", "wwws connections (in)", "connections"),
    builtin("wwws_out", "wwws connections (out)", "connections"),
    builtin("icmp_in", "ICMP packets (in)", "packets"),
    builtin("icmp_out", "ICMP packets (out)", "packets"),
    builtin("udp_in", "UDP dgrams (in)", "packets"),
    builtin("udp_out", "UDP dgrams (out)", "packets"),
    builtin("dns_in", "DNS requests (in)", "packets"),
    builtin("dns_out", "DNS requests (out)", "packets"),
    builtin("tcpsyn_in", "TCP sessions (in)", "packets"),
    builtin("tcpsyn_out", "TCP sessions (out)", "packets"),
    builtin("tcpack_in", "TCP acks (in)", "packets"),
    builtin("tcpack_out", "TCP acks (out)", "packets"),
    builtin("tcpfin_in", "TCP finish (in)", "packets"),
    builtin("tcpfin_out", "TCP finish (out)", "packets"),
    builtin("tcpmisc_in", "TCP misc (in)", "packets"),
    builtin("tcpmisc_out", "TCP misc (out)", "packets"),
    builtin("webaccess", "Webserver hits", "entries"),
    builtin("weberrors", "Webserver errors", "entries"),
    builtin("syslog", "New log entries (Syslog)", "entries"),
    builtin("messages", "New log entries (messages)", "entries"),
    builtin("temp0", "CPU Temperature 0", "Celcius"),
    builtin("temp1", "CPU Temperature 1", "Celcius"),
    builtin("temp2", "CPU Temperature 2", "Celcius"),
    builtin("temp3", "CPU Temperature 3", "Celcius"),
    builtin("cpu", "%CPU utilization (all)", "percent"),
    builtin("cpu0", "%CPU utilization 0", "percent"),
    builtin("cpu1", "%CPU utilization 1", "percent"),
    builtin("cpu2", "%CPU utilization 2", "percent"),
    builtin("cpu3", "%CPU utilization 3", "percent"),
    builtin("microsoft_ds_in", "Samba/netbios name lookups (in)", "packets"),
    builtin("microsoft_ds_out", "Samba/netbios name lookups (out)", "packets"),
    builtin("www_alt_in", "Alternative web service connections (in)", "connections"),
    builtin("www_alt_out", "Alternative web client connections (out)", "connections"),
    builtin("imaps_in", "encrypted imap mail service sessions (in)", "connections"),
    builtin("imaps_out", "encrypted imap mail client sessions (out)", "connections"),
    builtin("ldap_in", "LDAP directory service service sessions (in)", "connections"),
    builtin("ldap_out", "LDAP directory service client sessions (out)", "connections"),
    builtin("ldaps_in", "LDAP directory service service sessions (in)", "connections"),
    builtin("ldaps_out", "LDAP directory service client sessions (out)", "connections"),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_bounds() {
        assert!(ObservableId::new(0).is_ok());
        assert!(ObservableId::new(OBSERVABLE_COUNT - 1).is_ok());
        assert_eq!(
            ObservableId::new(OBSERVABLE_COUNT),
            Err(SlotError::IndexOutOfRange {
                index: OBSERVABLE_COUNT,
                max: OBSERVABLE_COUNT,
            })
        );
        assert!(ObservableId::extension(EXTENSION_COUNT).is_err());
    }

    #[test]
    fn test_partition() {
        let last_builtin = ObservableId::new(OB_SPARE - 1).unwrap();
        assert!(last_builtin.is_builtin());
        assert_eq!(last_builtin.extension_offset(), None);

        let first_extension = ObservableId::new(OB_SPARE).unwrap();
        assert!(!first_extension.is_builtin());
        assert_eq!(first_extension.extension_offset(), Some(0));
        assert_eq!(ObservableId::extension(5).unwrap().index(), OB_SPARE + 5);

        assert_eq!(ObservableId::all().count(), OBSERVABLE_COUNT);
        assert_eq!(
            ObservableId::all().filter(|id| id.is_builtin()).count(),
            OB_SPARE
        );
    }

    #[test]
    fn test_builtin_names_unique() {
        let mut names: Vec<_> = BUILTIN_OBSERVABLES.iter().map(|o| o.name).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), OB_SPARE);
        assert!(!names.contains(&"spare"));
    }
}
