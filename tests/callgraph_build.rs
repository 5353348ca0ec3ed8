// Call graph construction over on-disk projects: overloads, inheritance,
// static imports and identity collisions.
mod support;

use callscope::core::callgraph::MethodIdentity;
use callscope::infra::{Config, OverloadPolicy};

use support::JavaProject;

const CALC: &str = r#"package m;

public class Calc {
    public int add(int a, int b) { return a + b; }
    public int add(String s) { return s.length(); }
}
"#;

const USER: &str = r#"package m;

public class User {
    private Calc calc;

    public int run() {
        return calc.add(1, 2);
    }
}
"#;

fn overload_project() -> JavaProject {
    let project = JavaProject::new();
    project
        .file("src/main/java/m/Calc.java", CALC)
        .file("src/main/java/m/User.java", USER);
    project
}

fn callees(ws: &callscope::core::Workspace, caller: &MethodIdentity) -> Vec<String> {
    ws.graph().callees(caller).map(|c| c.key()).collect()
}

#[test]
fn merged_overloads_share_one_node() {
    let project = overload_project();
    let ws = project.workspace();

    // First declaration wins the location
    let add = MethodIdentity::new("m.Calc", "add");
    assert_eq!(ws.graph().location(&add).map(|l| l.line), Some(4));
    assert_eq!(ws.graph().method_count(), 2);

    assert_eq!(callees(&ws, &MethodIdentity::new("m.User", "run")), vec!["m.Calc#add"]);
}

#[test]
fn distinguished_overloads_bind_by_arity() {
    let project = overload_project();
    let ws = project.workspace_with(Config {
        overloads: OverloadPolicy::Distinguish,
        ..Config::default()
    });

    assert_eq!(ws.graph().method_count(), 3);

    let run = MethodIdentity::new("m.User", "run").with_params("");
    assert_eq!(callees(&ws, &run), vec!["m.Calc#add(int,int)"]);
}

#[test]
fn inherited_and_static_imported_methods_resolve() {
    let project = JavaProject::new();
    project
        .file(
            "src/main/java/a/Base.java",
            "package a;\npublic class Base {\n    protected void log(String s) {}\n}\n",
        )
        .file(
            "src/main/java/a/util/Strings.java",
            "package a.util;\npublic final class Strings {\n    public static String clean(String s) { return s; }\n}\n",
        )
        .file(
            "src/main/java/a/Child.java",
            "package a;\n\nimport static a.util.Strings.clean;\n\npublic class Child extends Base {\n    public void go(String s) {\n        log(clean(s));\n    }\n}\n",
        );
    let ws = project.workspace();

    let mut got = callees(&ws, &MethodIdentity::new("a.Child", "go"));
    got.sort();
    assert_eq!(got, vec!["a.Base#log", "a.util.Strings#clean"]);
}

#[test]
fn broken_files_are_left_out_of_the_graph() {
    let project = overload_project();
    project.file(
        "src/main/java/m/Broken.java",
        "package m;\npublic class Broken {\n    void x( { calc.add(1, 2); }\n}\n",
    );
    let ws = project.workspace();

    assert!(!ws.index().has_type("m.Broken"));
    assert_eq!(ws.graph().method_count(), 2);
}
