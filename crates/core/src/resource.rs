//! Resource model shared by the cache, the resolver and the REST client.
//!
//! Every backend resource is projected into a [`NamedItem`] so the cache and
//! resolver can treat all kinds uniformly. The set of kinds is closed and
//! enumerated by [`ResourceKind`].

use std::fmt::{Display, Formatter};
use std::str::FromStr;

use indexmap::IndexMap;

use crate::error::Error;

/// Which parts of the active [`Scope`] narrow a list query for a kind.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ScopeFilter {
    None,
    Site,
    SiteAndVpc,
}

#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
pub enum ResourceKind {
    Site,
    Vpc,
    Subnet,
    Instance,
    Machine,
    OperatingSystem,
    IpBlock,
    NetworkSecurityGroup,
    Audit,
    SshKey,
    SshKeyGroup,
    Sku,
    Rack,
    VpcPrefix,
    TenantAccount,
    Allocation,
    ExpectedMachine,
    InfinibandPartition,
    NvlinkLogicalPartition,
    DpuExtensionService,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 20] = [
        ResourceKind::Site,
        ResourceKind::Vpc,
        ResourceKind::Subnet,
        ResourceKind::Instance,
        ResourceKind::Machine,
        ResourceKind::OperatingSystem,
        ResourceKind::IpBlock,
        ResourceKind::NetworkSecurityGroup,
        ResourceKind::Audit,
        ResourceKind::SshKey,
        ResourceKind::SshKeyGroup,
        ResourceKind::Sku,
        ResourceKind::Rack,
        ResourceKind::VpcPrefix,
        ResourceKind::TenantAccount,
        ResourceKind::Allocation,
        ResourceKind::ExpectedMachine,
        ResourceKind::InfinibandPartition,
        ResourceKind::NvlinkLogicalPartition,
        ResourceKind::DpuExtensionService,
    ];

    /// CLI name, also used as the REST path segment.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ResourceKind::Site => "site",
            ResourceKind::Vpc => "vpc",
            ResourceKind::Subnet => "subnet",
            ResourceKind::Instance => "instance",
            ResourceKind::Machine => "machine",
            ResourceKind::OperatingSystem => "operating-system",
            ResourceKind::IpBlock => "ip-block",
            ResourceKind::NetworkSecurityGroup => "network-security-group",
            ResourceKind::Audit => "audit",
            ResourceKind::SshKey => "ssh-key",
            ResourceKind::SshKeyGroup => "ssh-key-group",
            ResourceKind::Sku => "sku",
            ResourceKind::Rack => "rack",
            ResourceKind::VpcPrefix => "vpc-prefix",
            ResourceKind::TenantAccount => "tenant-account",
            ResourceKind::Allocation => "allocation",
            ResourceKind::ExpectedMachine => "expected-machine",
            ResourceKind::InfinibandPartition => "infiniband-partition",
            ResourceKind::NvlinkLogicalPartition => "nvlink-logical-partition",
            ResourceKind::DpuExtensionService => "dpu-extension-service",
        }
    }

    /// Human-readable label used in selector headers and messages.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            ResourceKind::Site => "Site",
            ResourceKind::Vpc => "VPC",
            ResourceKind::Subnet => "Subnet",
            ResourceKind::Instance => "Instance",
            ResourceKind::Machine => "Machine",
            ResourceKind::OperatingSystem => "Operating System",
            ResourceKind::IpBlock => "IP Block",
            ResourceKind::NetworkSecurityGroup => "Network Security Group",
            ResourceKind::Audit => "Audit Entry",
            ResourceKind::SshKey => "SSH Key",
            ResourceKind::SshKeyGroup => "SSH Key Group",
            ResourceKind::Sku => "SKU",
            ResourceKind::Rack => "Rack",
            ResourceKind::VpcPrefix => "VPC Prefix",
            ResourceKind::TenantAccount => "Tenant Account",
            ResourceKind::Allocation => "Allocation",
            ResourceKind::ExpectedMachine => "Expected Machine",
            ResourceKind::InfinibandPartition => "InfiniBand Partition",
            ResourceKind::NvlinkLogicalPartition => "NVLink Logical Partition",
            ResourceKind::DpuExtensionService => "DPU Extension Service",
        }
    }

    #[must_use]
    pub fn scope_filter(self) -> ScopeFilter {
        match self {
            ResourceKind::Site
            | ResourceKind::Audit
            | ResourceKind::SshKey
            | ResourceKind::TenantAccount => ScopeFilter::None,
            ResourceKind::Subnet | ResourceKind::Instance | ResourceKind::VpcPrefix => {
                ScopeFilter::SiteAndVpc
            }
            _ => ScopeFilter::Site,
        }
    }

    /// Kinds whose cached lists depend on the active scope.
    #[must_use]
    pub fn is_scope_sensitive(self) -> bool {
        self.scope_filter() != ScopeFilter::None
    }

    /// Scope flags accepted by the scripted CLI's `list` for this kind.
    ///
    /// This differs from [`Self::scope_filter`] only for machines, whose CLI
    /// listing accepts `--vpc-id` although the interactive fetch filters on
    /// site alone.
    #[must_use]
    pub fn cli_scope_flags(self) -> ScopeFilter {
        match self {
            ResourceKind::Machine => ScopeFilter::SiteAndVpc,
            other => other.scope_filter(),
        }
    }

    /// Extra fields carried on each projected item, in display order.
    #[must_use]
    pub fn extra_keys(self) -> &'static [&'static str] {
        match self {
            ResourceKind::Vpc
            | ResourceKind::Machine
            | ResourceKind::IpBlock
            | ResourceKind::Allocation
            | ResourceKind::InfinibandPartition
            | ResourceKind::NvlinkLogicalPartition => &["siteId"],
            ResourceKind::Subnet | ResourceKind::VpcPrefix => &["vpcId"],
            ResourceKind::Instance => &["vpcId", "siteId", "machineId"],
            ResourceKind::Audit => &["method", "endpoint"],
            ResourceKind::SshKey => &["fingerprint"],
            ResourceKind::Sku => &["siteId", "deviceType"],
            ResourceKind::Rack => &["manufacturer", "model"],
            ResourceKind::TenantAccount => &["infrastructureProviderId"],
            ResourceKind::ExpectedMachine => &["siteId", "bmcMacAddress", "chassisSerialNumber"],
            ResourceKind::DpuExtensionService => &["siteId", "serviceType"],
            ResourceKind::Site
            | ResourceKind::OperatingSystem
            | ResourceKind::NetworkSecurityGroup
            | ResourceKind::SshKeyGroup => &[],
        }
    }

    pub fn scope_sensitive() -> impl Iterator<Item = ResourceKind> {
        Self::ALL.into_iter().filter(|k| k.is_scope_sensitive())
    }
}

impl Display for ResourceKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResourceKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| Error::UnknownResourceKind(s.to_string()))
    }
}

/// Uniform projection of a backend resource.
///
/// `extra` holds parent references (`siteId`, `vpcId`) and a few per-kind
/// display fields; `raw` keeps the payload the projection came from.
#[derive(Clone, Debug, PartialEq)]
pub struct NamedItem<P = serde_json::Value> {
    pub name: String,
    pub id: String,
    pub status: String,
    pub extra: IndexMap<String, String>,
    pub raw: P,
}

impl<P: Default> NamedItem<P> {
    pub fn new(name: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            id: id.into(),
            status: String::new(),
            extra: IndexMap::new(),
            raw: P::default(),
        }
    }
}

impl<P> NamedItem<P> {
    #[must_use]
    pub fn with_status(mut self, status: impl Into<String>) -> Self {
        self.status = status.into();
        self
    }

    #[must_use]
    pub fn with_extra(mut self, key: &str, value: impl Into<String>) -> Self {
        self.extra.insert(key.to_string(), value.into());
        self
    }

    /// Non-empty extra value for `key`.
    pub fn extra(&self, key: &str) -> Option<&str> {
        self.extra
            .get(key)
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }

    /// Case-insensitive exact match against name or id.
    pub fn matches(&self, query: &str) -> bool {
        eq_fold(&self.name, query) || eq_fold(&self.id, query)
    }
}

/// Unicode case-insensitive equality.
pub fn eq_fold(a: &str, b: &str) -> bool {
    a.to_lowercase() == b.to_lowercase()
}

/// The unit a selector operates on.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct SelectItem {
    pub label: String,
    pub id: String,
    pub extra: IndexMap<String, String>,
}

impl SelectItem {
    pub fn new(label: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            id: id.into(),
            extra: IndexMap::new(),
        }
    }
}

/// The active site/VPC filter.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Scope {
    pub site_id: String,
    pub site_name: String,
    pub vpc_id: String,
    pub vpc_name: String,
}

impl Scope {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.site_id.is_empty() && self.vpc_id.is_empty()
    }

    /// Query parameters narrowing a list of `kind` to this scope.
    #[must_use]
    pub fn query_params(&self, kind: ResourceKind) -> Vec<(&'static str, String)> {
        self.params_for(kind.scope_filter())
    }

    fn params_for(&self, filter: ScopeFilter) -> Vec<(&'static str, String)> {
        let mut params = Vec::new();
        if filter == ScopeFilter::None {
            return params;
        }
        if !self.site_id.is_empty() {
            params.push(("siteId", self.site_id.clone()));
        }
        if filter == ScopeFilter::SiteAndVpc && !self.vpc_id.is_empty() {
            params.push(("vpcId", self.vpc_id.clone()));
        }
        params
    }
}

/// Appends `--site-id`/`--vpc-id` to a scripted command line.
///
/// Flags are only added for the `list` action of kinds that accept them, and
/// never duplicate a flag already present in `parts`.
#[must_use]
pub fn with_scope_flags(scope: &Scope, parts: &[String]) -> Vec<String> {
    let mut out = parts.to_vec();
    let [resource, action, ..] = parts else {
        return out;
    };
    if action.trim() != "list" {
        return out;
    }
    let Ok(kind) = resource.trim().parse::<ResourceKind>() else {
        return out;
    };

    for (param, value) in scope.params_for(kind.cli_scope_flags()) {
        let flag = match param {
            "siteId" => "--site-id",
            _ => "--vpc-id",
        };
        if !out.iter().any(|p| p == flag) {
            out.push(flag.to_string());
            out.push(value);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scoped() -> Scope {
        Scope {
            site_id: "s-1".into(),
            site_name: "east".into(),
            vpc_id: "v-1".into(),
            vpc_name: "prod".into(),
        }
    }

    fn parts(p: &[&str]) -> Vec<String> {
        p.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_kind_round_trips_through_cli_name() {
        for kind in ResourceKind::ALL {
            assert_eq!(kind.as_str().parse::<ResourceKind>().unwrap(), kind);
        }
        assert!("nope".parse::<ResourceKind>().is_err());
    }

    #[test]
    fn test_scope_sensitive_set() {
        let sensitive: Vec<_> = ResourceKind::scope_sensitive().collect();
        assert!(!sensitive.contains(&ResourceKind::Site));
        assert!(!sensitive.contains(&ResourceKind::Audit));
        assert!(!sensitive.contains(&ResourceKind::SshKey));
        assert!(!sensitive.contains(&ResourceKind::TenantAccount));
        assert!(sensitive.contains(&ResourceKind::Vpc));
        assert!(sensitive.contains(&ResourceKind::Machine));
        assert_eq!(sensitive.len(), 16);
    }

    #[test]
    fn test_query_params_follow_kind_filter() {
        let scope = scoped();
        assert!(scope.query_params(ResourceKind::Site).is_empty());
        assert_eq!(
            scope.query_params(ResourceKind::Vpc),
            vec![("siteId", "s-1".to_string())]
        );
        assert_eq!(
            scope.query_params(ResourceKind::Subnet),
            vec![("siteId", "s-1".to_string()), ("vpcId", "v-1".to_string())]
        );
        assert!(Scope::default().query_params(ResourceKind::Subnet).is_empty());
    }

    #[test]
    fn test_scope_flags_only_for_list() {
        let scope = scoped();
        assert_eq!(
            with_scope_flags(&scope, &parts(&["subnet", "list"])),
            parts(&["subnet", "list", "--site-id", "s-1", "--vpc-id", "v-1"])
        );
        assert_eq!(
            with_scope_flags(&scope, &parts(&["subnet", "get", "x"])),
            parts(&["subnet", "get", "x"])
        );
        assert_eq!(
            with_scope_flags(&scope, &parts(&["site", "list"])),
            parts(&["site", "list"])
        );
    }

    #[test]
    fn test_scope_flags_machine_includes_vpc() {
        assert_eq!(
            with_scope_flags(&scoped(), &parts(&["machine", "list"])),
            parts(&["machine", "list", "--site-id", "s-1", "--vpc-id", "v-1"])
        );
    }

    #[test]
    fn test_scope_flags_not_duplicated() {
        assert_eq!(
            with_scope_flags(&scoped(), &parts(&["vpc", "list", "--site-id", "other"])),
            parts(&["vpc", "list", "--site-id", "other"])
        );
    }

    #[test]
    fn test_named_item_matches_case_insensitively() {
        let item: NamedItem = NamedItem::new("prod-vpc", "v-1");
        assert!(item.matches("PROD-VPC"));
        assert!(item.matches("V-1"));
        assert!(!item.matches("prod"));
    }

    #[test]
    fn test_named_item_matches_non_ascii_names() {
        let item: NamedItem = NamedItem::new("Zürich-Süd", "v-1");
        assert!(item.matches("ZÜRICH-SÜD"));
        assert!(eq_fold("ΑΘΉΝΑ", "αθήνα"));
    }

    #[test]
    fn test_named_item_extra_ignores_empty() {
        let item: NamedItem = NamedItem::new("a", "1")
            .with_extra("siteId", "")
            .with_extra("vpcId", "v");
        assert_eq!(item.extra("siteId"), None);
        assert_eq!(item.extra("vpcId"), Some("v"));
    }
}
