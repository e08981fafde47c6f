use std::future::Future;

use apireg_engine::{Page, PageOptions, Registry};
use apireg_models::SpecMessage;
use apireg_types::{SpecRevisionName, WILDCARD};
use tracing::debug;

use crate::error::TaskResult;
use crate::blocking;

/// Pin a spec message to the revision it describes.
pub fn pinned(spec: &SpecMessage) -> TaskResult<SpecRevisionName> {
    let name = SpecRevisionName::parse(&spec.name)?;
    Ok(name.spec.revision(spec.revision_id.clone()))
}

/// Call `visit` with each spec revision matched by `pattern`.
///
/// - `…/specs/{s}` or `…/specs/{s}@{rev}` visits that one revision
/// - a wildcard spec lists the current revision of every match
/// - `@-` lists every revision
///
/// `filter` applies to the listed cases. Returns the number visited.
pub async fn visit_specs<F, Fut>(
    registry: &Registry,
    pattern: &SpecRevisionName,
    filter: &str,
    mut visit: F,
) -> TaskResult<usize>
where
    F: FnMut(SpecRevisionName) -> Fut,
    Fut: Future<Output = TaskResult<()>>,
{
    let all_revisions = pattern.revision_id == WILDCARD;
    if !all_revisions && !pattern.spec.is_wildcard() {
        let name = pattern.clone();
        let spec = blocking(registry, move |r| r.get_spec(&name)).await?;
        visit(pinned(&spec)?).await?;
        return Ok(1);
    }

    let mut visited = 0;
    let mut token = String::new();
    loop {
        let options = PageOptions::default()
            .with_filter(filter)
            .with_token(token);
        let spec = pattern.spec.clone();
        let page: Page<SpecMessage> = blocking(registry, move |r| {
            if all_revisions {
                r.list_spec_revisions(&spec, &options)
            } else {
                r.list_specs(&spec.version(), &options)
            }
        })
        .await?;
        debug!(pattern = %pattern, returned = page.items.len(), "visiting page");
        for spec in &page.items {
            let name = pinned(spec)?;
            if pattern.spec.spec_id != WILDCARD && name.spec.spec_id != pattern.spec.spec_id {
                continue;
            }
            visit(name).await?;
            visited += 1;
        }
        if page.is_last() {
            return Ok(visited);
        }
        token = page.next_page_token;
    }
}
