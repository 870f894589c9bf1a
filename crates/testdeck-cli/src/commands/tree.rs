use anyhow::Result;
use std::path::Path;

use crate::app::App;
use crate::render;

pub async fn run(app: &App, project: Option<&Path>, all: bool) -> Result<()> {
    let session = app.open_session(project).await?;
    if all {
        let nodes = session.with_tree(|tree| tree.to_nodes());
        render::print_nodes(&nodes, 0);
    } else {
        render::print_rows(&session.visible_rows());
    }
    Ok(())
}
