//! File emitters. Everything here builds plain strings field by field
//! so byte-for-byte output is fully under our control.

use stackdraft_core::catalog::BindingKind;

use crate::{ResolvedBinding, WorkerTemplate};

pub(crate) fn ts_type(kind: BindingKind) -> &'static str {
    match kind {
        BindingKind::PersistentStore => "D1Database",
        BindingKind::Cache => "KVNamespace",
        BindingKind::ObjectStore => "R2Bucket",
        BindingKind::Queue => "Queue",
        BindingKind::VectorIndex => "VectorizeIndex",
        BindingKind::AiInference => "Ai",
    }
}

fn kind_label(kind: BindingKind) -> &'static str {
    match kind {
        BindingKind::PersistentStore => "D1 database",
        BindingKind::Cache => "KV namespace",
        BindingKind::ObjectStore => "R2 bucket",
        BindingKind::Queue => "Queue",
        BindingKind::VectorIndex => "Vectorize index",
        BindingKind::AiInference => "Workers AI",
    }
}

fn table_name(binding: &ResolvedBinding) -> String {
    binding.resource_name.replace('-', "_")
}

/// Infrastructure config: one declaration block per binding, grouped by
/// kind (the caller passes bindings already in kind order), fixed field
/// order inside each block. `generated_on` is the only date stamp.
pub(crate) fn wrangler_toml(
    project: &str,
    generated_on: &str,
    bindings: &[ResolvedBinding],
) -> String {
    let mut out = String::with_capacity(1024);
    out.push_str(&format!("# Generated by Stackdraft on {}\n", generated_on));
    out.push_str(&format!("name = \"{}\"\n", project));
    out.push_str("main = \"src/index.ts\"\n");
    out.push_str(&format!("compatibility_date = \"{}\"\n", generated_on));

    let mut ai_emitted = false;
    for binding in bindings {
        match binding.kind {
            BindingKind::PersistentStore => {
                out.push_str("\n[[d1_databases]]\n");
                out.push_str(&format!("binding = \"{}\"\n", binding.constant_name));
                out.push_str(&format!("database_name = \"{}\"\n", binding.resource_name));
                out.push_str("database_id = \"\"\n");
            }
            BindingKind::Cache => {
                out.push_str("\n[[kv_namespaces]]\n");
                out.push_str(&format!("binding = \"{}\"\n", binding.constant_name));
                out.push_str("id = \"\"\n");
            }
            BindingKind::ObjectStore => {
                out.push_str("\n[[r2_buckets]]\n");
                out.push_str(&format!("binding = \"{}\"\n", binding.constant_name));
                out.push_str(&format!("bucket_name = \"{}\"\n", binding.resource_name));
            }
            BindingKind::Queue => {
                out.push_str("\n[[queues.producers]]\n");
                out.push_str(&format!("binding = \"{}\"\n", binding.constant_name));
                out.push_str(&format!("queue = \"{}\"\n", binding.resource_name));
                out.push_str("\n[[queues.consumers]]\n");
                out.push_str(&format!("queue = \"{}\"\n", binding.resource_name));
                out.push_str("max_batch_size = 10\n");
            }
            BindingKind::VectorIndex => {
                out.push_str("\n[[vectorize]]\n");
                out.push_str(&format!("binding = \"{}\"\n", binding.constant_name));
                out.push_str(&format!("index_name = \"{}\"\n", binding.resource_name));
            }
            BindingKind::AiInference => {
                // The config format allows a single [ai] table; the
                // first AI node wins the binding name.
                if !ai_emitted {
                    out.push_str("\n[ai]\n");
                    out.push_str(&format!("binding = \"{}\"\n", binding.constant_name));
                    ai_emitted = true;
                }
            }
        }
    }
    out
}

pub(crate) fn package_json(
    project: &str,
    template: WorkerTemplate,
    bindings: &[ResolvedBinding],
) -> String {
    let has_ai = bindings.iter().any(|b| b.kind == BindingKind::AiInference);
    let first_store = bindings
        .iter()
        .find(|b| b.kind == BindingKind::PersistentStore);

    let mut scripts: Vec<(String, String)> = vec![
        ("dev".to_string(), "wrangler dev".to_string()),
        ("deploy".to_string(), "wrangler deploy".to_string()),
    ];
    if let Some(store) = first_store {
        scripts.push((
            "db:migrate".to_string(),
            format!("wrangler d1 migrations apply {} --remote", store.resource_name),
        ));
        scripts.push((
            "deploy:full".to_string(),
            "npm run db:migrate && npm run deploy".to_string(),
        ));
    }

    let mut dependencies: Vec<(&str, &str)> = Vec::new();
    if template == WorkerTemplate::Router {
        dependencies.push(("hono", "^4"));
    }
    if has_ai {
        dependencies.push(("@cloudflare/ai", "^1"));
    }

    let mut out = String::with_capacity(512);
    out.push_str("{\n");
    out.push_str(&format!("  \"name\": \"{}\",\n", project));
    out.push_str("  \"private\": true,\n");
    out.push_str("  \"scripts\": {\n");
    for (i, (name, cmd)) in scripts.iter().enumerate() {
        let comma = if i + 1 < scripts.len() { "," } else { "" };
        out.push_str(&format!("    \"{}\": \"{}\"{}\n", name, cmd, comma));
    }
    out.push_str("  },\n");
    if !dependencies.is_empty() {
        out.push_str("  \"dependencies\": {\n");
        for (i, (name, version)) in dependencies.iter().enumerate() {
            let comma = if i + 1 < dependencies.len() { "," } else { "" };
            out.push_str(&format!("    \"{}\": \"{}\"{}\n", name, version, comma));
        }
        out.push_str("  },\n");
    }
    out.push_str("  \"devDependencies\": {\n");
    out.push_str("    \"@cloudflare/workers-types\": \"^4\",\n");
    out.push_str("    \"typescript\": \"^5\",\n");
    out.push_str("    \"wrangler\": \"^3\"\n");
    out.push_str("  }\n");
    out.push_str("}\n");
    out
}

fn env_interface(bindings: &[ResolvedBinding]) -> String {
    let mut out = String::new();
    out.push_str("export interface Env {\n");
    for binding in bindings {
        out.push_str(&format!(
            "  {}: {};\n",
            binding.constant_name,
            ts_type(binding.kind)
        ));
    }
    out.push_str("}\n");
    out
}

fn queue_handler() -> &'static str {
    "async queue(batch: MessageBatch<unknown>, env: Env): Promise<void> {\n\
    for (const message of batch.messages) {\n\
      console.log(\"received\", message.id);\n\
      message.ack();\n\
    }\n\
  },\n"
}

pub(crate) fn worker_index(
    project: &str,
    template: WorkerTemplate,
    bindings: &[ResolvedBinding],
    routes: &[String],
) -> String {
    let has_queue = bindings.iter().any(|b| b.kind == BindingKind::Queue);
    let mut out = String::with_capacity(1024);

    match template {
        WorkerTemplate::Fetch => {
            out.push_str(&env_interface(bindings));
            out.push('\n');
            out.push_str("export default {\n");
            out.push_str(
                "  async fetch(request: Request, env: Env, ctx: ExecutionContext): Promise<Response> {\n",
            );
            out.push_str("    const url = new URL(request.url);\n");
            out.push_str("    if (url.pathname === \"/health\") {\n");
            out.push_str("      return Response.json({ ok: true });\n");
            out.push_str("    }\n");
            out.push_str(&format!(
                "    return new Response(\"{} is running\");\n",
                project
            ));
            out.push_str("  },\n");
            if has_queue {
                out.push_str("  ");
                out.push_str(queue_handler());
            }
            out.push_str("} satisfies ExportedHandler<Env>;\n");
        }
        WorkerTemplate::Router => {
            out.push_str("import { Hono } from \"hono\";\n\n");
            out.push_str(&env_interface(bindings));
            out.push('\n');
            out.push_str("const app = new Hono<{ Bindings: Env }>();\n\n");
            out.push_str(&format!(
                "app.get(\"/\", (c) => c.text(\"{} is running\"));\n",
                project
            ));
            out.push_str("app.get(\"/health\", (c) => c.json({ ok: true }));\n");
            for route in routes {
                out.push_str(&format!(
                    "app.get(\"/{route}\", (c) => c.text(\"{route} endpoint\"));\n"
                ));
            }
            out.push('\n');
            if has_queue {
                out.push_str("export default {\n");
                out.push_str("  fetch: app.fetch,\n");
                out.push_str("  ");
                out.push_str(queue_handler());
                out.push_str("};\n");
            } else {
                out.push_str("export default app;\n");
            }
        }
    }
    out
}

pub(crate) fn schema_sql(stores: &[&ResolvedBinding]) -> String {
    let mut out = String::with_capacity(256);
    for (i, store) in stores.iter().enumerate() {
        if i > 0 {
            out.push('\n');
        }
        out.push_str(&format!("-- Schema for {}\n", store.resource_name));
        out.push_str(&format!(
            "CREATE TABLE IF NOT EXISTS {} (\n",
            table_name(store)
        ));
        out.push_str("  id INTEGER PRIMARY KEY AUTOINCREMENT,\n");
        out.push_str("  name TEXT NOT NULL,\n");
        out.push_str("  created_at TEXT NOT NULL DEFAULT (datetime('now'))\n");
        out.push_str(");\n");
    }
    out
}

pub(crate) fn migration_sql(stores: &[&ResolvedBinding]) -> String {
    let mut out = String::from("-- Migration number: 0001\n");
    out.push_str(&schema_sql(stores));
    out
}

pub(crate) fn db_client_ts(stores: &[&ResolvedBinding]) -> String {
    let mut out = String::with_capacity(512);
    out.push_str("export interface Row {\n");
    out.push_str("  id: number;\n");
    out.push_str("  name: string;\n");
    out.push_str("  created_at: string;\n");
    out.push_str("}\n");
    for store in stores {
        let table = table_name(store);
        out.push('\n');
        out.push_str(&format!(
            "export async function list{}(db: D1Database): Promise<Row[]> {{\n",
            pascal(&table)
        ));
        out.push_str(&format!(
            "  const result = await db.prepare(\"SELECT * FROM {} ORDER BY id\").all<Row>();\n",
            table
        ));
        out.push_str("  return result.results ?? [];\n");
        out.push_str("}\n");
    }
    out
}

fn pascal(snake: &str) -> String {
    snake
        .split('_')
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect()
}

pub(crate) fn readme(
    title: &str,
    project: &str,
    bindings: &[ResolvedBinding],
) -> String {
    let has_store = bindings
        .iter()
        .any(|b| b.kind == BindingKind::PersistentStore);
    let heading = if title.trim().is_empty() { project } else { title };

    let mut out = String::with_capacity(1024);
    out.push_str(&format!("# {}\n\n", heading));
    out.push_str("Scaffolded from an architecture diagram. The generated worker, \n");
    out.push_str("bindings, and configuration mirror the diagram's nodes.\n");

    if !bindings.is_empty() {
        out.push_str("\n## Bindings\n\n");
        for binding in bindings {
            out.push_str(&format!(
                "- `{}`: {} `{}` ({})\n",
                binding.constant_name,
                kind_label(binding.kind),
                binding.resource_name,
                binding.label
            ));
        }
    }

    out.push_str("\n## Development\n\n");
    out.push_str("```sh\nnpm install\nnpm run dev\n```\n");

    if has_store {
        out.push_str("\n## Database\n\n");
        out.push_str("Create each database once, then apply migrations:\n\n");
        out.push_str("```sh\n");
        for binding in bindings
            .iter()
            .filter(|b| b.kind == BindingKind::PersistentStore)
        {
            out.push_str(&format!("npx wrangler d1 create {}\n", binding.resource_name));
        }
        out.push_str("npm run db:migrate\n");
        out.push_str("```\n");
        out.push_str("\nPaste the returned database ids into `wrangler.toml`.\n");
    }

    out.push_str("\n## Deploy\n\n");
    if has_store {
        out.push_str("```sh\nnpm run deploy:full\n```\n");
    } else {
        out.push_str("```sh\nnpm run deploy\n```\n");
    }
    out
}
