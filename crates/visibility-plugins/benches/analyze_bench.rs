use std::sync::Arc;

use criterion::async_executor::FuturesExecutor;
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use visibility_plugins::plugins::{content, schema};
use visibility_plugins::{
    AnalysisInput, AnalyzerPlugin, CompletionClient, CompletionError, LlmMentionsPlugin,
};

/// Answers every prompt instantly with the same recommendation list.
struct CannedClient;

#[async_trait::async_trait]
impl CompletionClient for CannedClient {
    async fn complete(&self, _prompt: &str) -> Result<String, CompletionError> {
        Ok("1. Roto-Rooter\n2. Acme Plumbing, a trusted local expert\n3. Mr. Rooter".to_string())
    }
}

const PAGE: &str = r#"
<html>
    <head>
        <title>Acme Plumbing | Springfield</title>
        <meta name="description" content="Emergency plumbing in Springfield">
        <meta name="author" content="Jane Doe">
        <script type="application/ld+json">
            [{"@type":"Organization","name":"Acme","url":"https://acme.com"},
             {"@type":"FAQPage","mainEntity":[]}]
        </script>
    </head>
    <body>
        <header><nav><a href="/">Home</a></nav></header>
        <main>
            <h1>Drain cleaning</h1>
            <h2>What does it cost?</h2>
            <p>Most residential jobs cost between one and two hundred dollars.</p>
            <h2>How long does it take?</h2>
            <p>A typical visit takes about an hour from start to finish.</p>
            <div class="address">742 Evergreen Terrace, Springfield</div>
            <p>Call (555) 123-4567 or email hello@acmeplumbing.com.</p>
        </main>
        <footer>Contact us</footer>
    </body>
</html>
"#;

fn analyze_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("analyze");
    let input = AnalysisInput::new("https://www.acme.com/services/drain-cleaning")
        .expect("valid url");

    group.bench_function("content_pass", |b| {
        b.iter(|| {
            let details = content::analyze_html(black_box(PAGE));
            black_box(content::content_score(&details));
        })
    });

    group.bench_function("schema_pass", |b| {
        b.iter(|| {
            let details = schema::inspect_html(&input, black_box(PAGE));
            black_box(schema::schema_score(&details));
        })
    });

    let client: Arc<dyn CompletionClient> = Arc::new(CannedClient);
    let mentions = LlmMentionsPlugin::new(Some(client));
    let local_input = input.clone().with_location("Springfield");

    group.bench_function("mention_pass", |b| {
        b.to_async(FuturesExecutor).iter(|| async {
            black_box(mentions.analyze(&local_input).await);
        })
    });

    group.finish();
}

criterion_group!(benches, analyze_benchmark);
criterion_main!(benches);
