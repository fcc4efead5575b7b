//! Upload and download tests through the facade.

mod common;

use std::sync::Arc;
use std::time::Duration;

use axios_kit::http::{PartValue, RequestBody, ResponseType};
use axios_kit::{
    FilePart, HttpMethod, KitError, MultipartForm, ResponseData, StatusContext,
    StreamingDescriptor, StreamingMode, StreamingOutput, TransportResponse, save_stream_file,
};
use bytes::Bytes;
use common::{EdgeCounts, MockTransport, active_kit};
use serde_json::{Value, json};

fn binary_response(status: u16, body: &'static [u8], headers: &[(&'static str, &'static str)]) -> TransportResponse {
    let mut response = TransportResponse::new(status, ResponseData::Binary(Bytes::from_static(body)));
    for (name, value) in headers {
        response.headers.insert(*name, value.parse().unwrap());
    }
    response.url = "https://api.test/exports/latest".to_string();
    response
}

fn three_files() -> Vec<FilePart> {
    vec![
        FilePart::new("one.txt", "1"),
        FilePart::new("two.txt", "22").mime_type("text/plain"),
        FilePart::blob("333"),
    ]
}

fn multipart(request: &axios_kit::TransportRequest) -> MultipartForm {
    match &request.body {
        RequestBody::Multipart(form) => form.clone(),
        other => panic!("expected multipart body, got {other:?}"),
    }
}

#[tokio::test]
async fn test_upload_three_files_in_order() {
    let transport = Arc::new(MockTransport::json(200, json!({"uploaded": 3})));
    let kit = active_kit(transport.clone());

    let output = kit
        .streaming(StreamingDescriptor::upload("/files", three_files()))
        .await
        .unwrap();
    assert_eq!(output, StreamingOutput::Value(json!({"uploaded": 3})));

    let call = transport.last_call();
    assert_eq!(call.method, HttpMethod::Post);
    let form = multipart(&call);
    assert_eq!(form.len(), 3);
    let contents: Vec<_> = form
        .get_all("file")
        .map(|part| match &part.value {
            PartValue::File(file) => file.data.clone(),
            PartValue::Text(_) => panic!("unexpected text part"),
        })
        .collect();
    assert_eq!(contents, ["1", "22", "333"]);
}

#[tokio::test]
async fn test_upload_custom_field_and_data() {
    let transport = Arc::new(MockTransport::json(200, json!({})));
    let kit = active_kit(transport.clone());

    kit.streaming(
        StreamingDescriptor::upload("/avatar", vec![FilePart::new("me.png", vec![0u8; 4])])
            .file_field("avatar")
            .map_request(|r| r.data(json!({"userId": 9})).params(json!({"v": 1}))),
    )
    .await
    .unwrap();

    let call = transport.last_call();
    assert_eq!(call.query, vec![("v".to_string(), "1".to_string())]);
    let form = multipart(&call);
    let names: Vec<_> = form.parts().iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, ["avatar", "userId"]);
    assert_eq!(form.parts()[1].value, PartValue::Text("9".to_string()));
}

#[tokio::test]
async fn test_upload_with_sequencer() {
    let transport = Arc::new(MockTransport::json(200, json!({})));
    let kit = active_kit(transport.clone());

    kit.streaming(
        StreamingDescriptor::upload("/batch", three_files()).sequence(
            |form: &mut MultipartForm, files: &[FilePart]| {
                for (i, file) in files.iter().enumerate() {
                    form.append_file(format!("part{}", files.len() - i), file.clone());
                }
            },
        ),
    )
    .await
    .unwrap();

    let form = multipart(&transport.last_call());
    let names: Vec<_> = form.parts().iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, ["part3", "part2", "part1"]);
}

#[tokio::test]
async fn test_sequencer_ignored_when_disabled() {
    let transport = Arc::new(MockTransport::json(200, json!({})));
    let kit = active_kit(transport.clone());

    let mut descriptor = StreamingDescriptor::upload("/batch", three_files())
        .sequence(|form: &mut MultipartForm, _files: &[FilePart]| form.append_text("seq", "1"));
    descriptor.enable_sequence = false;
    kit.streaming(descriptor).await.unwrap();

    let form = multipart(&transport.last_call());
    assert_eq!(form.get_all("file").count(), 3);
    assert_eq!(form.get_all("seq").count(), 0);
}

#[tokio::test]
async fn test_progress_callbacks_reach_transport() {
    let transport = Arc::new(MockTransport::json(200, json!({})));
    let kit = active_kit(transport.clone());

    kit.streaming(
        StreamingDescriptor::upload("/files", three_files())
            .on_upload_progress(|_| {})
            .on_download_progress(|_| {}),
    )
    .await
    .unwrap();

    let call = transport.last_call();
    assert!(call.on_upload_progress.is_some());
    assert!(call.on_download_progress.is_some());
}

#[tokio::test]
async fn test_download_envelope() {
    let transport = Arc::new(MockTransport::new(|_| {
        Ok(binary_response(
            200,
            b"%PDF-1.7",
            &[
                ("content-type", "application/pdf"),
                ("content-disposition", "attachment; filename=\"report.pdf\""),
            ],
        ))
    }));
    let kit = active_kit(transport.clone());

    let output = kit
        .streaming(StreamingDescriptor::download("/exports/latest"))
        .await
        .unwrap();

    assert_eq!(transport.last_call().response_type, ResponseType::Binary);
    let envelope = output.into_download().expect("download envelope");
    assert_eq!(envelope.code, 200);
    assert_eq!(envelope.message, "OK");
    assert_eq!(envelope.file_name(), "report.pdf");
    assert_eq!(envelope.header("content-type"), Some("application/pdf"));
    assert_eq!(envelope.bytes().as_ref(), b"%PDF-1.7");
}

#[tokio::test]
async fn test_download_rfc5987_filename() {
    let kit = active_kit(Arc::new(MockTransport::new(|_| {
        Ok(binary_response(
            200,
            b"cv",
            &[("content-disposition", "attachment; filename*=UTF-8''r%C3%A9sum%C3%A9.pdf")],
        ))
    })));

    let output = kit.streaming(StreamingDescriptor::download("/cv")).await.unwrap();
    assert_eq!(output.as_download().unwrap().file_name(), "résumé.pdf");
}

#[tokio::test]
async fn test_download_without_disposition_falls_back() {
    let kit = active_kit(Arc::new(MockTransport::new(|_| Ok(binary_response(200, b"x", &[])))));

    let output = kit
        .streaming(StreamingDescriptor::download("/exports/latest"))
        .await
        .unwrap();
    assert_eq!(output.as_download().unwrap().file_name(), "latest");

    let output = kit
        .streaming(StreamingDescriptor::download("/exports/latest").fallback_file_name("export.csv"))
        .await
        .unwrap();
    assert_eq!(output.as_download().unwrap().file_name(), "export.csv");
}

#[tokio::test]
async fn test_download_resolved_by_status_interceptor() {
    let kit = active_kit(Arc::new(MockTransport::new(|_| Ok(binary_response(200, b"x", &[])))));
    kit.use_status_interceptors(|ctx: StatusContext| ctx.resolver.resolve("x"));

    let output = kit.streaming(StreamingDescriptor::download("/f")).await.unwrap();
    assert_eq!(output, StreamingOutput::Value(json!("x")));
}

#[tokio::test]
async fn test_status_interceptor_sees_packaged_download() {
    let kit = active_kit(Arc::new(MockTransport::new(|_| {
        Ok(binary_response(
            200,
            b"%PDF",
            &[("content-disposition", "attachment; filename=\"report.pdf\"")],
        ))
    })));
    kit.use_status_interceptors(|ctx: StatusContext| {
        assert_eq!(ctx.response.status, 200);
        let body = ctx.response.data.clone().into_value();
        if body["code"] == 200 {
            ctx.resolver.resolve(body["data"]["streamConfig"]["fileName"].clone())
        } else {
            ctx.resolver.reject(body)
        }
    });

    let output = kit
        .streaming(StreamingDescriptor::download("/exports/latest"))
        .await
        .unwrap();
    assert_eq!(output, StreamingOutput::Value(json!("report.pdf")));
}

#[tokio::test]
async fn test_status_interceptor_rejects_download() {
    let kit = active_kit(Arc::new(MockTransport::new(|_| {
        Ok(binary_response(200, b"abc", &[]))
    })));
    kit.use_status_interceptors(|ctx: StatusContext| ctx.resolver.reject("quota exceeded"));

    let err = kit
        .streaming(StreamingDescriptor::download("/blob").custom_download_response(
            |_: &http::HeaderMap, data: Bytes| -> axios_kit::Result<Value> { Ok(json!(data.len())) },
        ))
        .await
        .unwrap_err();
    assert!(matches!(err, KitError::StatusRejected(reason) if reason == json!("quota exceeded")));
}

#[tokio::test]
async fn test_download_error_body_is_reinterpreted() {
    let kit = active_kit(Arc::new(MockTransport::new(|_| {
        Ok(binary_response(403, br#"{"message":"forbidden"}"#, &[]))
    })));
    let edges = EdgeCounts::install(&kit);

    let err = kit
        .streaming(StreamingDescriptor::download("/secret"))
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "HTTP 403: forbidden");
    assert_eq!(edges.stops(), 1);

    kit.use_status_interceptors(|ctx: StatusContext| {
        let body = ctx.response.data.clone().into_value();
        ctx.resolver.resolve(body["message"].clone())
    });
    let output = kit
        .streaming(StreamingDescriptor::download("/secret"))
        .await
        .unwrap();
    assert_eq!(output, StreamingOutput::Value(json!("forbidden")));
}

#[tokio::test]
async fn test_custom_download_response() {
    let kit = active_kit(Arc::new(MockTransport::new(|_| {
        Ok(binary_response(200, b"abc", &[("x-checksum", "900150983cd24fb0")]))
    })));

    let output = kit
        .streaming(StreamingDescriptor::download("/blob").custom_download_response(
            |headers: &http::HeaderMap, data: Bytes| -> axios_kit::Result<Value> {
                Ok(json!({
                    "size": data.len(),
                    "checksum": headers.get("x-checksum").and_then(|v| v.to_str().ok()),
                }))
            },
        ))
        .await
        .unwrap();

    assert_eq!(
        output,
        StreamingOutput::Value(json!({"size": 3, "checksum": "900150983cd24fb0"}))
    );
}

#[tokio::test]
async fn test_download_envelope_wire_shape() {
    let kit = active_kit(Arc::new(MockTransport::new(|_| {
        Ok(binary_response(200, &[1, 2], &[("content-disposition", "attachment; filename=a.bin")]))
    })));

    let value = kit
        .streaming(StreamingDescriptor::download("/a"))
        .await
        .unwrap()
        .into_value()
        .unwrap();

    assert_eq!(value["code"], 200);
    assert_eq!(value["data"]["streamConfig"]["fileName"], "a.bin");
    assert_eq!(value["data"]["streamResult"], json!([1, 2]));
}

#[tokio::test]
async fn test_default_mode_behaves_like_request() {
    let transport = Arc::new(MockTransport::json(200, json!({"id": 1})));
    let kit = active_kit(transport.clone());

    let descriptor = StreamingDescriptor::new(
        axios_kit::RequestDescriptor::get("/items").data(json!({"page": 1})),
        StreamingMode::Default,
    )
    .response_type(ResponseType::Text);
    let output = kit.streaming(descriptor).await.unwrap();

    assert_eq!(output, StreamingOutput::Value(json!({"id": 1})));
    let call = transport.last_call();
    assert_eq!(call.query, vec![("page".to_string(), "1".to_string())]);
    assert_eq!(call.response_type, ResponseType::Text);
}

#[tokio::test]
async fn test_streaming_requires_active_instance() {
    let transport = Arc::new(MockTransport::json(200, json!({})));
    let kit = active_kit(transport.clone());
    kit.destroy();

    let err = kit
        .streaming(StreamingDescriptor::upload("/files", three_files()))
        .await
        .unwrap_err();
    assert!(matches!(err, KitError::NotInitialized));
    assert_eq!(transport.call_count(), 0);
}

#[tokio::test]
async fn test_cancelled_download_decrements() {
    let transport = Arc::new(
        MockTransport::new(|_| Ok(binary_response(200, b"x", &[]))).with_delay(Duration::from_secs(10)),
    );
    let kit = active_kit(transport);
    let edges = EdgeCounts::install(&kit);

    let err = kit
        .streaming(
            StreamingDescriptor::download("/big")
                .map_request(|r| r.abort_generator(|controller| {
                    controller.abort();
                })),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, KitError::Cancelled));
    assert_eq!(edges.starts(), 1);
    assert_eq!(edges.stops(), 1);
}

#[tokio::test]
async fn test_save_downloaded_file() {
    let kit = active_kit(Arc::new(MockTransport::new(|_| {
        Ok(binary_response(
            200,
            b"col1,col2\n",
            &[("content-disposition", "attachment; filename=\"q3: report.csv\"")],
        ))
    })));
    let dir = tempfile::tempdir().unwrap();

    let envelope = kit
        .streaming(StreamingDescriptor::download("/report"))
        .await
        .unwrap()
        .into_download()
        .unwrap();
    let path = save_stream_file(&envelope, dir.path()).await.unwrap();

    assert_eq!(path.parent(), Some(dir.path()));
    assert_eq!(std::fs::read(&path).unwrap(), b"col1,col2\n");
}
