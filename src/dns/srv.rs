//! SRV records and RFC 2782 priority/weight selection.
use rand::Rng;

/// One SRV resource record as returned by DNS.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SrvRecord {
    /// lower values are tried first
    pub priority: u16,
    /// relative weight among records sharing a priority
    pub weight: u16,
    /// TCP/UDP port to connect to
    pub port: u16,
    /// target hostname, trailing dot (if any) not yet stripped
    pub target: String,
}

/// An unresolved (hostname, port) candidate, already stripped of any
/// trailing DNS root dot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateHost {
    /// hostname to resolve and connect to
    pub host: String,
    /// port to connect on
    pub port: u16,
}

/// The RFC 2782 "service not provided" sentinel: a lone SRV record whose
/// target is the root.
pub fn is_service_not_provided(records: &[SrvRecord]) -> bool {
    matches!(records, [only] if only.target == ".")
}

/// Apply RFC 2782 ordering: ascending priority, then weighted-random
/// selection within each priority group (weight-0 records sort last in
/// their group, already implied by the selection below).
pub fn select(records: &[SrvRecord]) -> Vec<CandidateHost> {
    let mut by_priority: Vec<&SrvRecord> = records.iter().collect();
    by_priority.sort_by_key(|r| r.priority);

    let mut out = Vec::with_capacity(records.len());
    let mut start = 0;
    while start < by_priority.len() {
        let priority = by_priority[start].priority;
        let end = by_priority[start..]
            .iter()
            .position(|r| r.priority != priority)
            .map(|n| start + n)
            .unwrap_or(by_priority.len());
        let mut group: Vec<&SrvRecord> = by_priority[start..end].to_vec();
        out.extend(weighted_drain(&mut group));
        start = end;
    }
    out
}

/// Repeatedly draw from `group` per RFC 2782 section 3: recompute the
/// running weight sum over the members still remaining, draw `r` in
/// `[0, sum]`, and take the first record whose cumulative weight is
/// `>= r`.
fn weighted_drain(group: &mut Vec<&SrvRecord>) -> Vec<CandidateHost> {
    let mut out = Vec::with_capacity(group.len());
    let mut rng = rand::rng();

    while !group.is_empty() {
        let sum: u32 = group.iter().map(|r| r.weight as u32).sum();
        let r = if sum == 0 { 0 } else { rng.random_range(0..=sum) };

        let mut running = 0u32;
        let mut chosen = 0;
        for (i, rec) in group.iter().enumerate() {
            running += rec.weight as u32;
            if running >= r {
                chosen = i;
                break;
            }
        }

        let rec = group.remove(chosen);
        out.push(CandidateHost {
            host: rec.target.trim_end_matches('.').to_owned(),
            port: rec.port,
        });
    }
    out
}
