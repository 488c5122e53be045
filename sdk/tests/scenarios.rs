#![allow(clippy::unwrap_used, clippy::indexing_slicing, reason = "test")]

use {
    aes::Aes128,
    base64::Engine,
    bytes::Bytes,
    cbc::cipher::{BlockEncryptMut, KeyIvInit, block_padding::NoPadding},
    ctr::cipher::StreamCipher,
    futures::{StreamExt, stream},
    megalink_sdk::{
        Client, Error, Result,
        crypto::{Attribute, BASE64, MasterKey, NodeKey, ctr_seek, encrypt_attribute},
        error::CryptoError,
        protocol::{EncryptedNode, NodeType},
        range::parse_range_header,
        transport::{HttpRequest, HttpResponse, Transport},
    },
    rand::seq::SliceRandom,
    reqwest::{
        StatusCode,
        header::{
            CONTENT_LENGTH, CONTENT_RANGE, CONTENT_TYPE, ETAG, HeaderMap, HeaderValue,
            IF_NONE_MATCH, RANGE,
        },
    },
    serde_json::json,
    std::{
        collections::HashSet,
        ops::ControlFlow,
        sync::{Arc, Mutex},
    },
    url::Url,
};

const API_HOST: &str = "g.api.test";
const CHUNK: usize = 7;

/// Answers API calls with a fixed reply and serves a single encrypted file.
#[derive(Clone, Default)]
struct FakeMega {
    api_reply: String,
    content: Vec<u8>,
    /// Serve this many bytes before the requested start.
    shift: u64,
    ignore_range: bool,
    requests: Arc<Mutex<Vec<HttpRequest>>>,
}

impl FakeMega {
    fn serve(&self, request: &HttpRequest) -> HttpResponse {
        if request.url.host_str() == Some(API_HOST) {
            return HttpResponse::from_bytes(
                StatusCode::OK,
                HeaderMap::new(),
                self.api_reply.clone(),
            );
        }
        let mut headers = HeaderMap::new();
        headers.insert(ETAG, HeaderValue::from_static("\"v1\""));
        let range = request
            .headers
            .get(RANGE)
            .filter(|_| !self.ignore_range)
            .map(|value| parse_range_header(value.to_str().unwrap()).unwrap());
        let total = self.content.len() as u64;
        let (status, data) = match range {
            None => (StatusCode::OK, self.content.clone()),
            Some((start, end)) => {
                let start = (start as u64).saturating_sub(self.shift);
                let last = end.map_or(total - 1, |end| (end as u64).min(total - 1));
                headers.insert(
                    CONTENT_RANGE,
                    HeaderValue::try_from(format!("bytes {start}-{last}/{total}")).unwrap(),
                );
                (
                    StatusCode::PARTIAL_CONTENT,
                    self.content[start as usize..=last as usize].to_vec(),
                )
            }
        };
        let chunks: Vec<Result<Bytes>> = data
            .chunks(CHUNK)
            .map(|chunk| Ok(Bytes::copy_from_slice(chunk)))
            .collect();
        HttpResponse {
            status,
            headers,
            body: stream::iter(chunks).boxed(),
        }
    }

    fn recorded(&self) -> Vec<HttpRequest> {
        self.requests.lock().unwrap().clone()
    }
}

impl Transport for FakeMega {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse> {
        let response = self.serve(&request);
        self.requests.lock().unwrap().push(request);
        Ok(response)
    }
}

fn client(fake: &FakeMega) -> Client<FakeMega> {
    Client::with_transport(
        fake.clone(),
        Url::parse(&format!("https://{API_HOST}/cs")).unwrap(),
    )
}

struct PublicFile {
    link: String,
    plaintext: Vec<u8>,
    fake: FakeMega,
}

fn public_file(name: &str, size: usize) -> PublicFile {
    let raw: [u8; 32] = rand::random();
    let key = NodeKey::from_file_bytes(&raw).unwrap();
    let plaintext: Vec<u8> = (0..size).map(|_| rand::random()).collect();
    let mut content = plaintext.clone();
    ctr_seek(&key.key, &key.ctr_iv(), 0).apply_keystream(&mut content);
    let attributes = encrypt_attribute(&Attribute { name: name.into() }, &key.key).unwrap();
    let fake = FakeMega {
        api_reply: json!([{"s": size, "at": attributes, "g": "https://dl.test/file/1"}])
            .to_string(),
        content,
        ..FakeMega::default()
    };
    PublicFile {
        link: format!("abcd1234!{}", BASE64.encode(raw)),
        plaintext,
        fake,
    }
}

async fn read_all(mut download: megalink_sdk::Download) -> Vec<u8> {
    let mut data = Vec::new();
    while let Some(chunk) = download.chunk().await.unwrap() {
        assert!(chunk.len() <= CHUNK);
        data.extend_from_slice(&chunk);
    }
    data
}

#[tokio::test]
async fn full_download() {
    let file = public_file("video.mp4", 100);
    let client = client(&file.fake);
    let info = client.resolve_file_link(&file.link).await.unwrap();
    assert_eq!(info.size, 100);
    assert_eq!(info.attribute.name, "video.mp4");

    let response = client.open_ranged(&info, &HeaderMap::new()).await.unwrap();
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.headers[CONTENT_LENGTH], "100");
    assert_eq!(response.headers[CONTENT_TYPE], "video/mp4");
    assert_eq!(response.headers[ETAG], "\"v1\"");
    assert!(response.headers.get(CONTENT_RANGE).is_none());
    assert_eq!(read_all(response.body).await, file.plaintext);
}

#[tokio::test]
async fn open_ended_range() {
    let file = public_file("video.mp4", 100);
    let client = client(&file.fake);
    let info = client.resolve_file_link(&file.link).await.unwrap();

    let mut headers = HeaderMap::new();
    headers.insert(RANGE, HeaderValue::from_static("bytes=50-"));
    headers.insert(IF_NONE_MATCH, HeaderValue::from_static("\"v0\""));
    let response = client.open_ranged(&info, &headers).await.unwrap();
    assert_eq!(response.status, StatusCode::PARTIAL_CONTENT);
    assert_eq!(response.headers[CONTENT_RANGE], "bytes 50-99/100");
    assert_eq!(response.headers[CONTENT_LENGTH], "50");
    assert_eq!(read_all(response.body).await, file.plaintext[50..]);

    let download_request = file.fake.recorded().pop().unwrap();
    assert_eq!(download_request.headers[RANGE], "bytes=50-");
    assert_eq!(download_request.headers[IF_NONE_MATCH], "\"v0\"");
}

#[tokio::test]
async fn every_offset_decrypts() {
    let file = public_file("data.bin", 70);
    let client = client(&file.fake);
    let info = client.resolve_file_link(&file.link).await.unwrap();
    for start in 0..70 {
        for end in [None, Some(start), Some(start + 16), Some(69)] {
            let options = megalink_sdk::DownloadOptions::new().range(start, end);
            let download = client.download(&info, &options).await.unwrap();
            let last = end.map_or(69, |end| end.min(69)) as usize;
            assert_eq!(
                read_all(download).await,
                file.plaintext[start as usize..=last],
                "{start}-{end:?}"
            );
        }
    }
}

#[tokio::test]
async fn decryption_follows_served_range() {
    let mut file = public_file("data.bin", 100);
    file.fake.shift = 3;
    let client = client(&file.fake);
    let info = client.resolve_file_link(&file.link).await.unwrap();
    let download = client
        .download(&info, &megalink_sdk::DownloadOptions::new().range(37, None))
        .await
        .unwrap();
    assert_eq!(download.range.start, 34);
    assert_eq!(read_all(download).await, file.plaintext[34..]);

    file.fake.shift = 0;
    file.fake.ignore_range = true;
    let client = self::client(&file.fake);
    let download = client
        .download(&info, &megalink_sdk::DownloadOptions::new().range(37, None))
        .await
        .unwrap();
    assert_eq!(download.status, StatusCode::OK);
    assert_eq!(read_all(download).await, file.plaintext);
}

#[tokio::test]
async fn inverted_range_is_rejected() {
    let file = public_file("data.bin", 100);
    let client = client(&file.fake);
    let info = client.resolve_file_link(&file.link).await.unwrap();
    let mut headers = HeaderMap::new();
    headers.insert(RANGE, HeaderValue::from_static("bytes=60-10"));
    let err = client.open_ranged(&info, &headers).await.unwrap_err();
    assert_eq!(err.status_code(), StatusCode::RANGE_NOT_SATISFIABLE);
    assert_eq!(file.fake.recorded().len(), 1);
}

#[tokio::test]
async fn missing_magic_is_crypto_error() {
    let raw: [u8; 32] = rand::random();
    let key = NodeKey::from_file_bytes(&raw).unwrap();
    let mut attr = br#"{"n":"video.mp4"}"#.to_vec();
    attr.resize(32, 0);
    let ciphertext = cbc::Encryptor::<Aes128>::new((&key.key).into(), (&[0; 16]).into())
        .encrypt_padded_mut::<NoPadding>(&mut attr, 32)
        .unwrap()
        .to_vec();
    let fake = FakeMega {
        api_reply: json!([{"s": 1, "at": BASE64.encode(ciphertext), "g": "https://dl.test/x"}])
            .to_string(),
        ..FakeMega::default()
    };
    let err = client(&fake)
        .resolve_file_link(&format!("!!abcd1234!{}", BASE64.encode(raw)))
        .await
        .unwrap_err();
    match err.root_cause() {
        Error::Crypto(CryptoError::BadMagic { prefix }) => {
            assert_eq!(prefix, &hex::encode(br#"{"n""#));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

const MASTER: [u8; 16] = [5; 16];

fn encrypted_node(handle: &str, parent: &str, node_type: NodeType) -> EncryptedNode {
    let raw: Vec<u8> = match node_type {
        NodeType::File => rand::random::<[u8; 32]>().to_vec(),
        _ => rand::random::<[u8; 16]>().to_vec(),
    };
    let key = match node_type {
        NodeType::File => NodeKey::from_file_bytes(&raw).unwrap(),
        _ => NodeKey::from_folder_bytes(&raw).unwrap(),
    };
    let encrypted_key = MasterKey::new(&MASTER).encrypt_node_key(&raw).unwrap();
    EncryptedNode {
        handle: handle.into(),
        parent: parent.into(),
        owner: "ownerXYZ".into(),
        key: format!("ownerXYZ:{}", BASE64.encode(encrypted_key)),
        timestamp: 0,
        size: 0,
        attributes: encrypt_attribute(
            &Attribute {
                name: format!("name of {handle}"),
            },
            &key.key,
        )
        .unwrap(),
        node_type,
    }
}

fn folder_fake(nodes: &[EncryptedNode]) -> FakeMega {
    FakeMega {
        api_reply: json!([{"f": nodes, "sn": "x"}]).to_string(),
        ..FakeMega::default()
    }
}

fn folder_link() -> String {
    format!("F0LDER01!{}", BASE64.encode(MASTER))
}

#[tokio::test]
async fn key_without_separator_is_skipped() {
    let mut nodes = vec![
        encrypted_node("ROOT0001", "", NodeType::Folder),
        encrypted_node("FILE0001", "ROOT0001", NodeType::File),
        encrypted_node("FILE0002", "ROOT0001", NodeType::File),
    ];
    nodes[1].key = "ownerXYZ".into();
    let fake = folder_fake(&nodes);
    let fm = client(&fake).open_folder_link(&folder_link()).await.unwrap();
    assert!(fm.lookup("FILE0001").is_none());
    assert!(fm.lookup_path("ROOT0001/FILE0001").is_none());
    assert_eq!(fm.lookup("FILE0002").unwrap().name(), "name of FILE0002");

    let request = &fake.recorded()[0];
    assert_eq!(request.url.query(), Some("id=1&n=F0LDER01"));
}

/// Random tree: each node gets a parent among the nodes created before it.
fn random_tree(size: usize) -> (Vec<EncryptedNode>, Vec<String>) {
    let mut nodes = vec![encrypted_node("N0000000", "OUTSIDE0", NodeType::Folder)];
    let mut paths = vec!["N0000000".to_owned()];
    let mut folders = vec![0];
    for index in 1..size {
        let parent = folders[rand::random_range(0..folders.len())];
        let handle = format!("N{index:07}");
        let node_type = if rand::random_bool(0.4) {
            folders.push(index);
            NodeType::Folder
        } else {
            NodeType::File
        };
        nodes.push(encrypted_node(&handle, &nodes[parent].handle.to_string(), node_type));
        paths.push(format!("{}/{handle}", paths[parent]));
    }
    (nodes, paths)
}

#[tokio::test]
async fn paths_and_walk_of_shuffled_listing() {
    let (mut nodes, paths) = random_tree(60);
    nodes[1..].shuffle(&mut rand::rng());
    let fake = folder_fake(&nodes);
    let fm = client(&fake).open_folder_link(&folder_link()).await.unwrap();

    for (index, path) in paths.iter().enumerate() {
        let node = fm.lookup_path(path).unwrap();
        assert_eq!(node.handle.as_str(), format!("N{index:07}"));
        assert!(!node.is_placeholder());
        assert!(fm.lookup_path(&format!("/{path}/")).is_some());
        assert!(fm.lookup_path(&format!("{path}/MISSING0")).is_none());
        let without_first = path.split_once('/').map_or("", |(_, rest)| rest);
        if !without_first.is_empty() {
            assert!(fm.lookup_path(without_first).is_none(), "{without_first}");
        }
    }

    let mut visited = Vec::new();
    let flow = fm.walk(|node| {
        visited.push(node.handle.to_string());
        ControlFlow::Continue(())
    });
    assert_eq!(flow, ControlFlow::Continue(()));
    assert_eq!(visited.len(), paths.len());
    assert_eq!(visited.iter().collect::<HashSet<_>>().len(), paths.len());
    assert_eq!(visited[0], "N0000000");

    let stop_at = visited[visited.len() / 2].clone();
    let mut partial = Vec::new();
    let flow = fm.walk(|node| {
        partial.push(node.handle.to_string());
        if node.handle == *stop_at.as_str() {
            ControlFlow::Break(())
        } else {
            ControlFlow::Continue(())
        }
    });
    assert_eq!(flow, ControlFlow::Break(()));
    assert_eq!(partial, visited[..=visited.len() / 2]);
}

#[tokio::test]
async fn folder_file_resolution() {
    let nodes = vec![
        encrypted_node("ROOT0001", "", NodeType::Folder),
        encrypted_node("FILE0001", "ROOT0001", NodeType::File),
    ];
    let fake = folder_fake(&nodes);
    let client = client(&fake);
    let fm = client.open_folder_link(&folder_link()).await.unwrap();
    let node = fm.lookup("FILE0001").unwrap();
    assert_eq!(node.node_type, NodeType::File);

    let err = client
        .resolve_folder_file(&folder_link(), "not a handle")
        .await
        .unwrap_err();
    assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
    let err = client
        .resolve_folder_file(&folder_link(), "MISSING0")
        .await
        .unwrap_err();
    assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
}
