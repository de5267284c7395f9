//! FIQL过滤表达式的词法分析器

use crate::token::{Span, Token, TokenKind};

pub struct Lexer<'a> {
    input: &'a str,
    /// 输入字符串中的当前位置（字节索引）
    position: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Lexer { input, position: 0 }
    }

    /// 返回当前位置的字符，不推进位置
    fn peek(&self) -> Option<char> {
        self.input[self.position..].chars().next()
    }

    /// 推进位置一个字符并返回该字符
    fn bump(&mut self) -> Option<char> {
        let c = self.peek();
        if let Some(c) = c {
            self.position += c.len_utf8();
        }
        c
    }

    /// 跳过空白字符
    fn skip_whitespace(&mut self) {
        while let Some(c) = self.peek() {
            if c.is_whitespace() {
                self.bump();
            } else {
                break;
            }
        }
    }

    /// 判断字符是否属于文本片段（属性名或比较值）
    /// 文本片段在遇到组合符、括号或运算符起始字符时结束
    fn is_text_char(c: char) -> bool {
        !matches!(c, ';' | ',' | '(' | ')' | '=' | '!') && !c.is_whitespace()
    }

    /// 读取一段文本：属性名或比较值
    /// 日期、数字、通配符等都先作为原始文本读出，由语法分析器按 schema 定型
    fn read_text(&mut self, start: usize) -> Token<'a> {
        while let Some(c) = self.peek() {
            if Self::is_text_char(c) {
                self.bump();
            } else {
                break;
            }
        }
        Token {
            kind: TokenKind::Text(&self.input[start..self.position]),
            span: Span::new(start, self.position),
        }
    }

    /// 读取以 '=' 开头的运算符
    /// 注意：开始的 '=' 已经被调用者消费
    /// 可能是 `==`，FIQL 的 `=lt=` 系列，或未知的自定义 `=tok=` 运算符
    fn read_operator(&mut self, start: usize) -> Token<'a> {
        if self.peek() == Some('=') {
            self.bump();
            return Token {
                kind: TokenKind::Eq,
                span: Span::new(start, self.position),
            };
        }

        // 读取 =tok= 形式的运算符名
        while let Some(c) = self.peek() {
            if c.is_ascii_alphanumeric() {
                self.bump();
            } else {
                break;
            }
        }

        // 运算符必须以第二个 '=' 结束，否则是非法 token
        if self.peek() != Some('=') {
            return Token {
                kind: TokenKind::Illegal,
                span: Span::new(start, self.position),
            };
        }
        self.bump(); // 消费结束的 '='

        let literal = &self.input[start..self.position];
        let kind = match literal {
            "=lt=" => TokenKind::Lt,
            "=le=" => TokenKind::Le,
            "=gt=" => TokenKind::Gt,
            "=ge=" => TokenKind::Ge,
            _ => TokenKind::Custom(literal),
        };
        Token {
            kind,
            span: Span::new(start, self.position),
        }
    }
}

impl<'a> Iterator for Lexer<'a> {
    type Item = Token<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        self.skip_whitespace();
        let start = self.position;

        let Some(c) = self.bump() else {
            return None; // 到达输入末尾
        };

        let token = match c {
            '(' => Token { kind: TokenKind::LParen, span: Span::new(start, self.position) },
            ')' => Token { kind: TokenKind::RParen, span: Span::new(start, self.position) },
            ';' => Token { kind: TokenKind::Semicolon, span: Span::new(start, self.position) },
            ',' => Token { kind: TokenKind::Comma, span: Span::new(start, self.position) },
            '=' => self.read_operator(start),
            '!' => {
                if self.peek() == Some('=') {
                    self.bump();
                    Token { kind: TokenKind::NotEq, span: Span::new(start, self.position) }
                } else {
                    Token { kind: TokenKind::Illegal, span: Span::new(start, self.position) }
                }
            }
            c if Self::is_text_char(c) => self.read_text(start),
            _ => Token { kind: TokenKind::Illegal, span: Span::new(start, self.position) },
        };
        Some(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_comparison() {
        let input = "tenantName==taters";
        let kinds: Vec<_> = Lexer::new(input).map(|t| t.kind).collect();
        assert_eq!(
            kinds,
            vec![
                TokenKind::Text("tenantName"),
                TokenKind::Eq,
                TokenKind::Text("taters"),
            ]
        );
    }

    #[test]
    fn test_all_operators() {
        let input = "a==1;a!=2;a=lt=3;a=le=4;a=gt=5;a=ge=6";
        let ops: Vec<_> = Lexer::new(input)
            .map(|t| t.kind)
            .filter(|k| !matches!(k, TokenKind::Text(_) | TokenKind::Semicolon))
            .collect();
        assert_eq!(
            ops,
            vec![
                TokenKind::Eq,
                TokenKind::NotEq,
                TokenKind::Lt,
                TokenKind::Le,
                TokenKind::Gt,
                TokenKind::Ge,
            ]
        );
    }

    #[test]
    fn test_custom_operator() {
        let input = "storedBytes=approx=100";
        let kinds: Vec<_> = Lexer::new(input).map(|t| t.kind).collect();
        assert_eq!(
            kinds,
            vec![
                TokenKind::Text("storedBytes"),
                TokenKind::Custom("=approx="),
                TokenKind::Text("100"),
            ]
        );
    }

    #[test]
    fn test_composite_with_parens() {
        let input = "tenantName==taters,(containerName==delicious;tenantName==dinner)";
        let kinds: Vec<_> = Lexer::new(input).map(|t| t.kind).collect();
        assert_eq!(
            kinds,
            vec![
                TokenKind::Text("tenantName"),
                TokenKind::Eq,
                TokenKind::Text("taters"),
                TokenKind::Comma,
                TokenKind::LParen,
                TokenKind::Text("containerName"),
                TokenKind::Eq,
                TokenKind::Text("delicious"),
                TokenKind::Semicolon,
                TokenKind::Text("tenantName"),
                TokenKind::Eq,
                TokenKind::Text("dinner"),
                TokenKind::RParen,
            ]
        );
    }

    #[test]
    fn test_count_function_form() {
        let input = "count(tags)=ge=2";
        let kinds: Vec<_> = Lexer::new(input).map(|t| t.kind).collect();
        assert_eq!(
            kinds,
            vec![
                TokenKind::Text("count"),
                TokenKind::LParen,
                TokenKind::Text("tags"),
                TokenKind::RParen,
                TokenKind::Ge,
                TokenKind::Text("2"),
            ]
        );
    }

    #[test]
    fn test_value_with_punctuation() {
        // 日期、标签等值会带有 '-'、':'、'.'、'*' 之类的字符
        let input = "updatedTime=ge=2017-07-04T07:07:07.235-0700,tags==user:1234,tenantName==Test*";
        let texts: Vec<_> = Lexer::new(input)
            .filter_map(|t| match t.kind {
                TokenKind::Text(s) => Some(s),
                _ => None,
            })
            .collect();
        assert_eq!(
            texts,
            vec![
                "updatedTime",
                "2017-07-04T07:07:07.235-0700",
                "tags",
                "user:1234",
                "tenantName",
                "Test*",
            ]
        );
    }

    #[test]
    fn test_unterminated_operator_is_illegal() {
        let input = "a=lt";
        let kinds: Vec<_> = Lexer::new(input).map(|t| t.kind).collect();
        assert_eq!(kinds, vec![TokenKind::Text("a"), TokenKind::Illegal]);
    }

    #[test]
    fn test_spans_are_byte_offsets() {
        let input = "ab==cd";
        let tokens: Vec<_> = Lexer::new(input).collect();
        assert_eq!(tokens[0].span, Span::new(0, 2));
        assert_eq!(tokens[1].span, Span::new(2, 4));
        assert_eq!(tokens[2].span, Span::new(4, 6));
    }
}
