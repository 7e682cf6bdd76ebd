use rolegate_core::backend::PermissionBackend;
use rolegate_core::catalog::PermissionCatalog;
use rolegate_core::model::{CategoryGroup, Permission, Role};
use std::fmt::Write;
use std::sync::Arc;

pub async fn permissions(backend: Arc<dyn PermissionBackend>, by_category: bool) -> anyhow::Result<()> {
    let catalog = PermissionCatalog::new(backend);
    if by_category {
        print!("{}", render_groups(&catalog.list_permissions_by_category().await?));
    } else {
        print!("{}", render_permissions(&catalog.list_permissions().await?));
    }
    Ok(())
}

pub async fn roles(backend: Arc<dyn PermissionBackend>) -> anyhow::Result<()> {
    let catalog = PermissionCatalog::new(backend);
    print!("{}", render_roles(&catalog.list_roles().await?));
    Ok(())
}

fn permission_line(out: &mut String, indent: &str, permission: &Permission) {
    let _ = write!(out, "{}{:>4}  {}", indent, permission.id, permission.name);
    if let Some(description) = &permission.description {
        let _ = write!(out, "  ({})", description);
    }
    out.push('\n');
}

pub fn render_permissions(permissions: &[Permission]) -> String {
    let mut out = String::new();
    for permission in permissions {
        permission_line(&mut out, "", permission);
        let _ = writeln!(out, "      category: {}", permission.category);
    }
    out
}

pub fn render_groups(groups: &[CategoryGroup]) -> String {
    let mut out = String::new();
    for group in groups {
        let _ = writeln!(out, "[{}]", group.category);
        for permission in &group.permissions {
            permission_line(&mut out, "  ", permission);
        }
    }
    out
}

pub fn render_roles(roles: &[Role]) -> String {
    let mut out = String::new();
    for role in roles {
        let marker = if role.is_default { "  (default)" } else { "" };
        let _ = writeln!(out, "{:>4}  {}{}", role.id, role.name, marker);
    }
    out
}
