use azcache_core::{CacheError, ClusterNode};

/// Primary nodes listed in a `CLUSTER NODES` reply.
///
/// Each line reads `<id> <ip:port@cport[,hostname]> <flags> <master> ...`.
/// Replicas and nodes flagged as failed or without an address are skipped.
pub fn parse_cluster_nodes(reply: &str) -> Result<Vec<ClusterNode>, CacheError> {
    let mut nodes = Vec::new();

    for line in reply.lines().map(str::trim).filter(|l| !l.is_empty()) {
        let mut fields = line.split_whitespace();

        let (Some(id), Some(address), Some(flags)) = (fields.next(), fields.next(), fields.next())
        else {
            return Err(CacheError::protocol(format!(
                "Malformed CLUSTER NODES line: {}",
                line
            )));
        };

        let flags: Vec<&str> = flags.split(',').collect();
        if !flags.contains(&"master") || flags.iter().any(|f| matches!(*f, "fail" | "noaddr")) {
            continue;
        }

        nodes.push(ClusterNode {
            id: id.to_string(),
            port: parse_port(address)?,
        });
    }

    Ok(nodes)
}

fn parse_port(address: &str) -> Result<u16, CacheError> {
    let host_port = address.split(['@', ',']).next().unwrap_or(address);

    host_port
        .rsplit_once(':')
        .and_then(|(_, port)| port.parse().ok())
        .ok_or_else(|| CacheError::protocol(format!("Invalid node address: {}", address)))
}
