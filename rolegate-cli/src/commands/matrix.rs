use rolegate_core::backend::PermissionBackend;
use rolegate_core::config::RolegateConfig;
use rolegate_core::matrix::{Matrix, MatrixStore};
use rolegate_core::model::{PermissionId, RoleId};
use std::fmt::Write;
use std::sync::Arc;

fn store(backend: Arc<dyn PermissionBackend>, config: &RolegateConfig) -> MatrixStore {
    MatrixStore::new(backend).with_busy_policy(config.matrix.busy_policy)
}

pub async fn show(backend: Arc<dyn PermissionBackend>, config: &RolegateConfig) -> anyhow::Result<()> {
    let matrix = store(backend, config).load_matrix().await?;
    print!("{}", render(&matrix));
    Ok(())
}

pub async fn toggle(
    backend: Arc<dyn PermissionBackend>,
    config: &RolegateConfig,
    role: RoleId,
    permission: PermissionId,
) -> anyhow::Result<()> {
    let store = store(backend, config);
    if config.matrix.load_on_start {
        store.load_matrix().await?;
    }
    let matrix = store.toggle_assignment(role, permission).await?;

    let state = if matrix.has_assignment(role, permission) { "assigned" } else { "revoked" };
    println!("role {} / permission {}: {}", role, permission, state);
    Ok(())
}

/// Permissions as rows (grouped by category), roles as columns
pub fn render(matrix: &Matrix) -> String {
    let name_width = matrix.permissions().iter().map(|p| p.name.len()).max().unwrap_or(0).max(10);

    let mut out = String::new();
    let _ = write!(out, "{:width$}", "", width = name_width + 2);
    for role in matrix.roles() {
        let _ = write!(out, " | {}", role.name);
    }
    out.push('\n');

    for group in matrix.grouped_permissions() {
        let _ = writeln!(out, "[{}]", group.category);
        for permission in &group.permissions {
            let _ = write!(out, "  {:width$}", permission.name, width = name_width);
            for role in matrix.roles() {
                let mark = if matrix.has_assignment(role.id, permission.id) { "x" } else { "." };
                let _ = write!(out, " | {:^width$}", mark, width = role.name.len());
            }
            out.push('\n');
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use rolegate_core::backend::MemoryBackend;

    #[tokio::test]
    async fn renders_assignments() {
        let store = MatrixStore::new(Arc::new(MemoryBackend::demo()));
        let rendered = render(&store.load_matrix().await.unwrap());

        assert!(rendered.lines().next().unwrap().contains("| Admin | Viewer | Project Manager"));
        let reports = rendered.lines().find(|l| l.trim_start().starts_with("ver_informes")).unwrap();
        assert_eq!(reports.matches('x').count(), 2);
    }
}
