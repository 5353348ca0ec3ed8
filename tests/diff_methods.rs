// Diff-driven changed-method detection feeding context assembly.
mod support;

use callscope::core::ChainStyle;
use callscope::core::context::{ContextRequest, assemble};
use callscope::core::diff::changed_methods_from_diff;

use support::{REPOSITORY, SERVICE, shop};

fn cancel_body_diff() -> String {
    format!(
        "diff --git a/{SERVICE} b/{SERVICE}
index 1111111..2222222 100644
--- a/{SERVICE}
+++ b/{SERVICE}
@@ -15,1 +15,1 @@
-        repo.delete(id.trim());
+        repo.delete(id);
"
    )
}

#[test]
fn body_change_is_attributed_to_the_enclosing_method() {
    let project = shop();

    let methods = changed_methods_from_diff(project.path(), &cancel_body_diff(), &[SERVICE.to_string()])
        .expect("scan diff");

    assert_eq!(methods.len(), 1);
    assert_eq!(methods[SERVICE], vec!["cancel"]);
}

#[test]
fn diff_narrows_seeds_to_changed_methods() {
    let project = shop();
    let ws = project.workspace();
    let files = vec![SERVICE.to_string()];

    let methods = changed_methods_from_diff(ws.root(), &cancel_body_diff(), &files).expect("scan diff");
    let result = assemble(
        &ws,
        &ContextRequest {
            changed_files: files,
            changed_methods: Some(methods),
            up_depth: 0,
            down_depth: 2,
            chain_style: ChainStyle::Pair,
        },
    );

    // cancel -> delete only; placeOrder's save/write chain is not seeded
    assert_eq!(result.related_files.len(), 1);
    assert_eq!(result.related_files[0].path, REPOSITORY);
    assert_eq!(
        result.call_chains,
        vec!["OrderService.cancel() -> OrderRepository.delete()"]
    );
}

#[test]
fn new_method_declaration_is_recorded_once() {
    let project = shop();
    let diff = format!(
        "diff --git a/{SERVICE} b/{SERVICE}
--- a/{SERVICE}
+++ b/{SERVICE}
@@ -16,2 +16,5 @@
     }}
+    public void refund(String id) {{
+        repo.delete(id);
+    }}
 }}
"
    );

    let methods = changed_methods_from_diff(project.path(), &diff, &[SERVICE.to_string()]).expect("scan diff");

    assert_eq!(methods[SERVICE], vec!["refund"]);
}
