//! 流式文档构建模块
//!
//! `RawDocument::put` 每次追加都重建整个缓冲区，适合少量修改。
//! 需要一次性写出大量字段时使用 [`RawDocumentBuilder`]: 单次顺序写入，
//! 嵌套文档和数组的长度头在关闭时回填。

use crate::codec;
use crate::raw::RawDocument;
use crate::spec::ElementType;
use crate::value::Bson;
use crate::wire;
use crate::{BsonError, BsonResult, CodecConfig};
use tracing::trace;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FrameKind {
    Document,
    Array,
}

/// 一层尚未关闭的文档或数组
#[derive(Debug)]
struct Frame {
    kind: FrameKind,
    /// 长度头偏移
    start: usize,
    /// 数组下一个元素的下标
    next_index: usize,
}

/// 单次写入的文档构建器
///
/// 每个方法要么完整写入一个元素，要么失败且缓冲区保持调用前的状态。
///
/// ```rust,ignore
/// let mut b = RawDocumentBuilder::new();
/// b.append("name", "miku")?;
/// b.begin_array("tags")?;
/// b.push("vocal")?;
/// b.end()?;
/// let doc = b.finish()?;
/// ```
#[derive(Debug)]
pub struct RawDocumentBuilder {
    buf: Vec<u8>,
    frames: Vec<Frame>,
    config: CodecConfig,
}

impl RawDocumentBuilder {
    pub fn new() -> Self {
        Self::with_config(CodecConfig::default())
    }

    pub fn with_config(config: CodecConfig) -> Self {
        let mut buf = Vec::with_capacity(config.initial_capacity);
        let start = wire::begin_document(&mut buf);
        Self {
            buf,
            frames: vec![Frame {
                kind: FrameKind::Document,
                start,
                next_index: 0,
            }],
            config,
        }
    }

    /// 当前已写入的字节数（含未回填的长度头）
    pub fn written(&self) -> usize {
        self.buf.len()
    }

    /// 当前嵌套深度，顶层文档为 1
    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    /// 在当前文档中追加字段
    pub fn append(&mut self, name: &str, value: impl Into<Bson>) -> BsonResult<()> {
        self.expect_frame(FrameKind::Document)?;
        self.write_element(name.as_bytes(), &value.into())
    }

    /// 在当前数组末尾追加元素，下标自动生成
    pub fn push(&mut self, value: impl Into<Bson>) -> BsonResult<()> {
        let index = self.take_index()?;
        self.write_element(index.as_bytes(), &value.into())?;
        self.advance_index();
        Ok(())
    }

    /// 在当前文档中开始一个嵌套文档字段
    pub fn begin_document(&mut self, name: &str) -> BsonResult<()> {
        self.expect_frame(FrameKind::Document)?;
        self.open(name.as_bytes(), FrameKind::Document)
    }

    /// 在当前文档中开始一个数组字段
    pub fn begin_array(&mut self, name: &str) -> BsonResult<()> {
        self.expect_frame(FrameKind::Document)?;
        self.open(name.as_bytes(), FrameKind::Array)
    }

    /// 在当前数组末尾开始一个嵌套文档
    pub fn push_document(&mut self) -> BsonResult<()> {
        let index = self.take_index()?;
        self.open(index.as_bytes(), FrameKind::Document)?;
        self.advance_parent_index();
        Ok(())
    }

    /// 在当前数组末尾开始一个嵌套数组
    pub fn push_array(&mut self) -> BsonResult<()> {
        let index = self.take_index()?;
        self.open(index.as_bytes(), FrameKind::Array)?;
        self.advance_parent_index();
        Ok(())
    }

    /// 关闭最内层的嵌套文档或数组，回填其长度
    pub fn end(&mut self) -> BsonResult<()> {
        if self.frames.len() <= 1 {
            return Err(BsonError::malformed("no open nested document to end"));
        }
        let start = self.frames[self.frames.len() - 1].start;
        wire::end_document(&mut self.buf, start)?;
        self.frames.pop();
        Ok(())
    }

    /// 关闭顶层文档并返回结果
    ///
    /// 仍有未关闭的嵌套层时返回 `MalformedDocument`。
    pub fn finish(mut self) -> BsonResult<RawDocument<'static>> {
        if self.frames.len() != 1 {
            return Err(BsonError::malformed(format!(
                "{} nested documents left open",
                self.frames.len() - 1
            )));
        }
        let start = self.frames[0].start;
        wire::end_document(&mut self.buf, start)?;
        trace!(bytes = self.buf.len(), "finished streaming document");
        Ok(RawDocument::from_vec(self.buf)?.with_config(self.config))
    }

    fn current(&self) -> BsonResult<&Frame> {
        self.frames
            .last()
            .ok_or_else(|| BsonError::malformed("builder has no open document"))
    }

    fn expect_frame(&self, kind: FrameKind) -> BsonResult<()> {
        let frame = self.current()?;
        if frame.kind != kind {
            let (expected, actual) = match kind {
                FrameKind::Document => ("document", "array"),
                FrameKind::Array => ("array", "document"),
            };
            return Err(BsonError::type_mismatch(expected, actual));
        }
        Ok(())
    }

    fn take_index(&self) -> BsonResult<String> {
        self.expect_frame(FrameKind::Array)?;
        Ok(self.current()?.next_index.to_string())
    }

    fn advance_index(&mut self) {
        if let Some(frame) = self.frames.last_mut() {
            frame.next_index += 1;
        }
    }

    fn advance_parent_index(&mut self) {
        let depth = self.frames.len();
        if depth >= 2 {
            self.frames[depth - 2].next_index += 1;
        }
    }

    fn write_element(&mut self, name: &[u8], value: &Bson) -> BsonResult<()> {
        let mark = self.buf.len();
        let result = wire::put_element_header(&mut self.buf, value.element_type(), name)
            .and_then(|_| codec::write_payload(&mut self.buf, value));
        if result.is_err() {
            self.buf.truncate(mark);
        }
        result
    }

    fn open(&mut self, name: &[u8], kind: FrameKind) -> BsonResult<()> {
        let tag = match kind {
            FrameKind::Document => ElementType::EmbeddedDocument,
            FrameKind::Array => ElementType::Array,
        };
        wire::put_element_header(&mut self.buf, tag, name)?;
        let start = wire::begin_document(&mut self.buf);
        self.frames.push(Frame {
            kind,
            start,
            next_index: 0,
        });
        Ok(())
    }
}

impl Default for RawDocumentBuilder {
    fn default() -> Self {
        Self::new()
    }
}
