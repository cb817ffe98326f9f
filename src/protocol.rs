//! Wire encoding of requests and replies on a channel.
//!
//! Every text field is UTF-8 terminated by a NUL byte.
//!
//! V1 request, exactly [`ARG_COUNT_MAX`] arguments:
//!
//! ```text
//! 1\0<cmd>\0<arg0>\0<arg1>\0<arg2>\0
//! ```
//!
//! V2 request, `size` is the decimal byte count of what follows its terminator and the number of
//! arguments is free:
//!
//! ```text
//! 2\0<size>\0<cmd>\0(<arg>\0)*
//! ```
//!
//! Reply, the output runs until the channel is closed:
//!
//! ```text
//! <result>\n<output>
//! ```

use futures::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::{
    error::ProtocolError, request::ApiVersion, ARG_COUNT_MAX, ARG_LENGTH_MAX, NAME_LENGTH_MAX,
};

/// Upper bound of the body of a V2 request.
pub const MAX_V2_REQUEST_SIZE: usize = 256 * 1024;

// Room for a version or a size field.
const HEADER_FIELD_MAX: usize = 16;

/// A request read from a channel.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Request {
    pub version: ApiVersion,
    pub name: String,
    pub args: Vec<String>,
}

/// A reply read from a channel.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Reply {
    pub result: i32,
    pub output: String,
}

/// Reads one request.
pub async fn read_request<R>(input: &mut R) -> Result<Request, ProtocolError>
where
    R: AsyncRead + Unpin,
{
    let version = read_field(input, HEADER_FIELD_MAX).await?;
    match version.as_str() {
        "1" => {
            let name = read_field(input, NAME_LENGTH_MAX).await?;
            let mut args = Vec::with_capacity(ARG_COUNT_MAX);
            for _ in 0..ARG_COUNT_MAX {
                args.push(read_field(input, ARG_LENGTH_MAX).await?);
            }
            Ok(Request {
                version: ApiVersion::V1,
                name,
                args,
            })
        }
        "2" => {
            let size = read_field(input, HEADER_FIELD_MAX).await?;
            let len = size
                .parse::<usize>()
                .ok()
                .filter(|len| (1..=MAX_V2_REQUEST_SIZE).contains(len))
                .ok_or_else(|| ProtocolError::InvalidSize(size.clone()))?;
            let mut body = vec![0u8; len];
            input.read_exact(&mut body).await.map_err(eof_as_truncated)?;
            let (name, args) = split_body(&body)?;
            Ok(Request {
                version: ApiVersion::V2,
                name,
                args,
            })
        }
        _ => Err(ProtocolError::UnsupportedVersion(version)),
    }
}

/// Writes one request. Used by clients.
///
/// A V1 request carries exactly [`ARG_COUNT_MAX`] arguments: missing ones are sent empty, extra
/// ones are refused.
pub async fn write_request<W>(
    output: &mut W,
    version: ApiVersion,
    name: &str,
    args: &[&str],
) -> Result<(), ProtocolError>
where
    W: AsyncWrite + Unpin,
{
    if name.len() > NAME_LENGTH_MAX {
        return Err(ProtocolError::TooLong {
            max: NAME_LENGTH_MAX,
        });
    }
    let mut buf = Vec::new();
    match version {
        ApiVersion::V1 => {
            if args.len() > ARG_COUNT_MAX {
                return Err(ProtocolError::TooManyArgs { max: ARG_COUNT_MAX });
            }
            if args.iter().any(|arg| arg.len() > ARG_LENGTH_MAX) {
                return Err(ProtocolError::TooLong {
                    max: ARG_LENGTH_MAX,
                });
            }
            push_field(&mut buf, "1");
            push_field(&mut buf, name);
            for i in 0..ARG_COUNT_MAX {
                push_field(&mut buf, args.get(i).copied().unwrap_or_default());
            }
        }
        ApiVersion::V2 => {
            let mut body = Vec::new();
            push_field(&mut body, name);
            for arg in args {
                push_field(&mut body, arg);
            }
            if body.len() > MAX_V2_REQUEST_SIZE {
                return Err(ProtocolError::TooLong {
                    max: MAX_V2_REQUEST_SIZE,
                });
            }
            push_field(&mut buf, "2");
            push_field(&mut buf, &body.len().to_string());
            buf.extend_from_slice(&body);
        }
    }
    output.write_all(&buf).await?;
    output.flush().await?;
    Ok(())
}

/// Writes the result code and the output. The caller flushes.
pub async fn write_reply<W>(output: &mut W, result: i32, text: &str) -> Result<(), ProtocolError>
where
    W: AsyncWrite + Unpin,
{
    output.write_all(format!("{result}\n").as_bytes()).await?;
    output.write_all(text.as_bytes()).await?;
    Ok(())
}

/// Reads a full reply, until the end of the stream. Used by clients.
pub async fn read_reply<R>(input: &mut R) -> Result<Reply, ProtocolError>
where
    R: AsyncRead + Unpin,
{
    let mut raw = Vec::new();
    input.read_to_end(&mut raw).await?;
    let raw = String::from_utf8(raw).map_err(|_| ProtocolError::InvalidUtf8)?;
    let (code, output) = raw
        .split_once('\n')
        .ok_or_else(|| ProtocolError::InvalidReply("missing result line".to_owned()))?;
    let result = code
        .trim()
        .parse()
        .map_err(|_| ProtocolError::InvalidReply(format!("bad result code {code:?}")))?;
    Ok(Reply {
        result,
        output: output.to_owned(),
    })
}

async fn read_field<R>(input: &mut R, max: usize) -> Result<String, ProtocolError>
where
    R: AsyncRead + Unpin,
{
    let mut field = Vec::new();
    let mut byte = [0u8; 1];
    loop {
        input.read_exact(&mut byte).await.map_err(eof_as_truncated)?;
        if byte[0] == 0 {
            break;
        }
        if field.len() == max {
            return Err(ProtocolError::TooLong { max });
        }
        field.push(byte[0]);
    }
    String::from_utf8(field).map_err(|_| ProtocolError::InvalidUtf8)
}

fn split_body(body: &[u8]) -> Result<(String, Vec<String>), ProtocolError> {
    // Every field, the last one included, is terminated
    let fields = body.strip_suffix(&[0]).ok_or(ProtocolError::Truncated)?;
    let mut fields = fields.split(|b| *b == 0).map(|field| {
        std::str::from_utf8(field)
            .map(str::to_owned)
            .map_err(|_| ProtocolError::InvalidUtf8)
    });
    let name = fields.next().ok_or(ProtocolError::Truncated)??;
    if name.len() > NAME_LENGTH_MAX {
        return Err(ProtocolError::TooLong {
            max: NAME_LENGTH_MAX,
        });
    }
    let args = fields.collect::<Result<Vec<_>, _>>()?;
    Ok((name, args))
}

fn push_field(buf: &mut Vec<u8>, field: &str) {
    buf.extend_from_slice(field.as_bytes());
    buf.push(0);
}

fn eof_as_truncated(err: std::io::Error) -> ProtocolError {
    if err.kind() == std::io::ErrorKind::UnexpectedEof {
        ProtocolError::Truncated
    } else {
        ProtocolError::Io(err)
    }
}
