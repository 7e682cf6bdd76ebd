use anyhow::Context;
use clap::Args;
use rolegate_core::backend::PermissionBackend;
use rolegate_core::rbac::{AccessGate, GateProps, SessionAuthority, SessionResolver, SessionState};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Args, Debug, Default)]
pub struct CheckArgs {
    /// Session payload file ({"permissions": [...], "roles": [...]})
    #[arg(long, conflicts_with = "as_roles")]
    pub session: Option<PathBuf>,

    /// Resolve the authority from these role names through the catalog
    #[arg(long = "as-roles", value_delimiter = ',')]
    pub as_roles: Vec<String>,

    /// Gate props as JSON, e.g. '{"permissions":["a","b"],"requireAll":true}'
    #[arg(long, conflicts_with_all = ["permission", "role", "permissions"])]
    pub props: Option<String>,

    #[arg(long)]
    pub permission: Option<String>,

    #[arg(long)]
    pub role: Option<String>,

    #[arg(long, value_delimiter = ',')]
    pub permissions: Option<Vec<String>>,

    /// With --permissions: require every one instead of any
    #[arg(long)]
    pub require_all: bool,
}

impl CheckArgs {
    pub fn gate_props(&self) -> anyhow::Result<GateProps> {
        if let Some(json) = &self.props {
            return serde_json::from_str(json).context("Invalid --props JSON");
        }
        Ok(GateProps {
            permission: self.permission.clone(),
            role: self.role.clone(),
            permissions: self.permissions.clone(),
            require_all: self.require_all,
        })
    }
}

/// Prints `granted` or `denied`; returns whether access was granted
pub async fn run(backend: Arc<dyn PermissionBackend>, args: CheckArgs) -> anyhow::Result<bool> {
    let gate = AccessGate::from_props(args.gate_props()?)?;

    let resolver = SessionResolver::new(backend);
    let authority = match &args.session {
        Some(path) => {
            let json = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read session file: {}", path.display()))?;
            SessionAuthority::from_payload(&json)
                .with_context(|| format!("Invalid session payload: {}", path.display()))?
        }
        None if !args.as_roles.is_empty() => resolver.resolve(&args.as_roles).await?,
        None => resolver.fetch().await?,
    };

    let granted = gate.allows(&SessionState::ready(authority)).unwrap_or(false);
    log::debug!("{:?} -> {}", gate.policy(), granted);
    println!("{}", if granted { "granted" } else { "denied" });
    Ok(granted)
}
