//! MetalLB address pool configuration
//!
//! The pool is carved out of the cluster's Docker subnet so LoadBalancer
//! addresses are reachable from the host.

use crate::config::Subnet;
use crate::error::{Error, Result};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use serde::Serialize;

pub const NAMESPACE: &str = "metallb-system";
pub const POOL_NAME: &str = "local-pool";
const API_VERSION: &str = "metallb.io/v1beta1";

/// Host offsets (inside the subnet) reserved for LoadBalancer services
const POOL_FIRST: u32 = 200;
const POOL_LAST: u32 = 250;

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct IpAddressPool {
    pub api_version: String,
    pub kind: String,
    pub metadata: ObjectMeta,
    pub spec: IpAddressPoolSpec,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct IpAddressPoolSpec {
    pub addresses: Vec<String>,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct L2Advertisement {
    pub api_version: String,
    pub kind: String,
    pub metadata: ObjectMeta,
    pub spec: L2AdvertisementSpec,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct L2AdvertisementSpec {
    pub ip_address_pools: Vec<String>,
}

fn meta(name: &str) -> ObjectMeta {
    ObjectMeta {
        name: Some(name.to_string()),
        namespace: Some(NAMESPACE.to_string()),
        ..Default::default()
    }
}

/// Address range `first-last` for LoadBalancer services
pub fn address_range(subnet: &Subnet) -> Result<String> {
    match (subnet.host(POOL_FIRST), subnet.host(POOL_LAST)) {
        (Some(first), Some(last)) => Ok(format!("{}-{}", first, last)),
        _ => Err(Error::InvalidSpec(format!(
            "subnet {} is too small for a load balancer pool",
            subnet
        ))),
    }
}

pub fn address_pool(subnet: &Subnet) -> Result<IpAddressPool> {
    Ok(IpAddressPool {
        api_version: API_VERSION.to_string(),
        kind: "IPAddressPool".to_string(),
        metadata: meta(POOL_NAME),
        spec: IpAddressPoolSpec {
            addresses: vec![address_range(subnet)?],
        },
    })
}

pub fn l2_advertisement() -> L2Advertisement {
    L2Advertisement {
        api_version: API_VERSION.to_string(),
        kind: "L2Advertisement".to_string(),
        metadata: meta(POOL_NAME),
        spec: L2AdvertisementSpec {
            ip_address_pools: vec![POOL_NAME.to_string()],
        },
    }
}

/// Pool and advertisement as one multi-document YAML stream
pub fn pool_manifest(subnet: &Subnet) -> Result<String> {
    let docs = [
        serde_yaml::to_string(&address_pool(subnet)?)?,
        serde_yaml::to_string(&l2_advertisement())?,
    ];
    Ok(docs.join("---\n"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_address_range_from_default_subnet() {
        let subnet: Subnet = "172.23.0.0/24".parse().unwrap();

        assert_eq!(
            address_range(&subnet).unwrap(),
            "172.23.0.200-172.23.0.250"
        );
    }

    #[test]
    fn test_address_range_rejects_small_subnet() {
        let subnet: Subnet = "172.23.0.0/26".parse().unwrap();

        let err = address_range(&subnet).unwrap_err();
        assert_eq!(err.reason_code(), "invalid-spec");
    }

    #[test]
    fn test_pool_manifest_shape() {
        let subnet: Subnet = "10.20.0.0/16".parse().unwrap();

        let yaml = pool_manifest(&subnet).unwrap();
        let docs: Vec<serde_yaml::Value> = yaml
            .split("---\n")
            .map(|d| serde_yaml::from_str(d).unwrap())
            .collect();

        assert_eq!(docs[0]["kind"].as_str(), Some("IPAddressPool"));
        assert_eq!(docs[0]["apiVersion"].as_str(), Some("metallb.io/v1beta1"));
        assert_eq!(
            docs[0]["spec"]["addresses"][0].as_str(),
            Some("10.20.0.200-10.20.0.250")
        );
        assert_eq!(docs[1]["kind"].as_str(), Some("L2Advertisement"));
        assert_eq!(
            docs[1]["spec"]["ipAddressPools"][0].as_str(),
            Some(POOL_NAME)
        );
        assert_eq!(docs[1]["metadata"]["namespace"].as_str(), Some(NAMESPACE));
    }
}
