use std::fs;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use serde_json::json;
use tempfile::tempdir;

use takt::config::RuntimeConfig;
use takt::function::arguments::Arguments;
use takt::function::function::RuntimeFunction;
use takt::function::native::NativeFunction;
use takt::function::plugin::Plugin;
use takt::function::types::FunctionError;
use takt::runtime::{Runtime, RuntimeError};
use takt::service::simple::SimpleCompletionService;

fn math_plugin() -> Plugin {
    let add = Arc::new(NativeFunction::new(
        "math",
        "add",
        |arguments: Arguments| async move {
            let a = arguments.require("a")?.as_i64().unwrap_or_default();
            let b = arguments.require("b")?.as_i64().unwrap_or_default();
            Ok(json!(a + b))
        },
    ));
    let multiply = Arc::new(NativeFunction::new(
        "math",
        "multiply",
        |arguments: Arguments| async move {
            let a = arguments.require("a")?.as_i64().unwrap_or_default();
            let b = arguments.require("b")?.as_i64().unwrap_or_default();
            Ok(json!(a * b))
        },
    ));
    Plugin::new("math")
        .with_functions(vec![add, multiply])
        .unwrap()
}

#[tokio::test]
async fn test_math_plugin_end_to_end() {
    let runtime = Runtime::default();
    runtime.register_plugin(math_plugin()).unwrap();

    let add = runtime.get_function("math", "add").unwrap();
    let result = runtime
        .invoke(add, Arguments::new().with("a", 2).with("b", 3))
        .await
        .unwrap()
        .unwrap();

    assert_eq!(result.value, json!(5));
    assert_eq!(result.function.qualified_name(), "math.add");
}

#[tokio::test]
async fn test_pipeline_chains_results_through_handler() {
    let runtime = Runtime::default();
    runtime.register_plugin(math_plugin()).unwrap();

    // 前段の結果を次段の引数へ橋渡しするハンドラ
    runtime.register_invoked_handler(|event| {
        if let Some(result) = &event.result {
            let mut updated = event.arguments.clone();
            updated.set("a", result.value.clone());
            event.update_arguments(updated);
        }
    });

    let add = runtime.get_function("math", "add").unwrap();
    let multiply = runtime.get_function("math", "multiply").unwrap();
    let results = runtime
        .invoke_pipeline(
            vec![add, multiply],
            Arguments::new().with("a", 2).with("b", 3),
        )
        .await
        .unwrap();

    // (2 + 3) * 3
    let values: Vec<_> = results.iter().map(|r| r.value.clone()).collect();
    assert_eq!(values, vec![json!(5), json!(15)]);
}

#[tokio::test]
async fn test_hooks_observe_each_step() {
    let runtime = Runtime::default();
    runtime.register_plugin(math_plugin()).unwrap();

    let seen = Arc::new(Mutex::new(Vec::new()));
    let seen_clone = Arc::clone(&seen);
    runtime.register_invoking_handler(move |event| {
        seen_clone
            .lock()
            .unwrap()
            .push(event.metadata.qualified_name());
    });

    let add = runtime.get_function("math", "add").unwrap();
    let multiply = runtime.get_function("math", "multiply").unwrap();
    runtime
        .invoke_pipeline(
            vec![add, multiply],
            Arguments::new().with("a", 1).with("b", 1),
        )
        .await
        .unwrap();

    assert_eq!(
        *seen.lock().unwrap(),
        vec!["math.add".to_string(), "math.multiply".to_string()]
    );
}

#[tokio::test]
async fn test_plugin_loaded_from_directory_answers_prompts() {
    let dir = tempdir().unwrap();
    let function_dir = dir.path().join("writer").join("summarize");
    fs::create_dir_all(&function_dir).unwrap();
    fs::write(function_dir.join("prompt.txt"), "Summarize: ping").unwrap();
    fs::write(
        function_dir.join("config.json"),
        r#"{
            "description": "Summarize the input",
            "input_variables": [{"name": "input"}]
        }"#,
    )
    .unwrap();

    let runtime = Runtime::default();
    runtime
        .register_service(
            Arc::new(SimpleCompletionService::new("default").with_response("ping", "pong")),
            false,
        )
        .unwrap();

    let plugin = runtime
        .register_plugin_from_directory(dir.path(), "writer")
        .unwrap();
    assert_eq!(plugin.function_names(), vec!["summarize"]);

    let function = runtime.get_function("writer", "summarize").unwrap();
    assert_eq!(
        function.metadata().description.as_deref(),
        Some("Summarize the input")
    );

    let result = runtime
        .invoke(function, Arguments::new())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(result.value, json!("pong"));
    assert_eq!(result.metadata.get("model"), Some(&json!("default")));
}

#[tokio::test]
async fn test_prompt_without_service_fails_with_pair() {
    let runtime = Runtime::default();

    let result = runtime.invoke_prompt("ping", Arguments::new()).await;
    match result {
        Err(RuntimeError::InvocationFailed {
            plugin_name,
            function_name,
            source,
        }) => {
            assert!(plugin_name.starts_with("p_"));
            assert_eq!(function_name, "prompt");
            assert!(matches!(source, FunctionError::Service(_)));
        }
        other => panic!("expected InvocationFailed, got {:?}", other),
    }
}

#[tokio::test]
async fn test_service_lifecycle_through_runtime() {
    let runtime = Runtime::default();
    runtime
        .register_service(
            Arc::new(SimpleCompletionService::new("default").with_response("ping", "pong")),
            false,
        )
        .unwrap();

    let result = runtime
        .invoke_prompt("ping", Arguments::new())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(result.value, json!("pong"));

    // サービスを外すと同じプロンプトは失敗する
    runtime.clear_services();
    let result = runtime.invoke_prompt("ping", Arguments::new()).await;
    assert!(result.is_err());
}

#[tokio::test]
async fn test_pinned_service_id_wins_over_registration_order() {
    let runtime = Runtime::default();
    runtime
        .register_service(
            Arc::new(SimpleCompletionService::new("first").with_response("ping", "from first")),
            false,
        )
        .unwrap();
    runtime
        .register_service(
            Arc::new(SimpleCompletionService::new("second").with_response("ping", "from second")),
            false,
        )
        .unwrap();

    let settings = runtime.execution_settings_from_service("second").unwrap();
    let result = runtime
        .invoke_prompt("ping", Arguments::new().with_settings(settings))
        .await
        .unwrap()
        .unwrap();

    assert_eq!(result.value, json!("from second"));
    assert_eq!(result.metadata.get("model"), Some(&json!("second")));
}

#[tokio::test]
async fn test_repeat_limit_from_config_file() {
    let dir = tempdir().unwrap();
    let config_path = dir.path().join("runtime.json");
    fs::write(
        &config_path,
        r#"{"invocation": {"max_repeats": 1, "stream_buffer": 8}}"#,
    )
    .unwrap();

    let config = RuntimeConfig::from_file(&config_path).unwrap();
    assert_eq!(config.invocation.max_repeats, Some(1));

    let runtime = Runtime::new(config);
    runtime.register_plugin(math_plugin()).unwrap();
    runtime.register_invoked_handler(|event| event.repeat());

    let add = runtime.get_function("math", "add").unwrap();
    let result = runtime
        .invoke(add, Arguments::new().with("a", 1).with("b", 1))
        .await;
    assert!(matches!(
        result,
        Err(RuntimeError::RepeatLimitExceeded { limit: 1, .. })
    ));
}

#[tokio::test]
async fn test_handler_recovers_from_fault_and_pipeline_continues() {
    let runtime = Runtime::default();
    let failing: Arc<dyn RuntimeFunction> = Arc::new(NativeFunction::new(
        "demo",
        "flaky",
        |_: Arguments| async move { Err(FunctionError::Execution("boom".to_string())) },
    ));
    let after: Arc<dyn RuntimeFunction> = Arc::new(NativeFunction::new(
        "demo",
        "after",
        |_: Arguments| async move { Ok(json!("done")) },
    ));

    let recovered = Arc::new(AtomicUsize::new(0));
    let recovered_clone = Arc::clone(&recovered);
    runtime.register_invoked_handler(move |event| {
        if event.error.take().is_some() {
            recovered_clone.fetch_add(1, Ordering::SeqCst);
        }
    });

    let results = runtime
        .invoke_pipeline(vec![failing, after], Arguments::new())
        .await
        .unwrap();

    // 失敗ステップは結果を残さず、後続は実行される
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].value, json!("done"));
    assert_eq!(recovered.load(Ordering::SeqCst), 1);
}
