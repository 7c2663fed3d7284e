use super::access::split_tagged;
use super::config::PreprocessConfig;
use super::errors::{PreprocessError, Result};
use super::function::{FunctionHeader, FunctionLowering};
use super::storage::StorageLayoutPlanner;
use super::tables::{ExternTable, PreprocessResult};
use quill_core::{NameGenerator, Node, SourceSpan};
use tracing::{debug, warn};

/// Function names with a fixed role; they take no parameters and get no
/// dispatch index.
pub const RESERVED_FUNCTIONS: [&str; 3] = ["init", "shared", "any"];

/// Classifies top-level declarations and assembles the final program.
///
/// Owns the unique-name generator, so prefixes are distinct across every
/// function lowered by one assembler and two assemblers never interfere.
#[derive(Debug, Clone, Default)]
pub struct ProgramAssembler {
    config: PreprocessConfig,
    names: NameGenerator,
}

/// Declarations sorted into the slots of the output program.
#[derive(Default)]
struct Classified {
    init: Option<Node>,
    shared: Option<Node>,
    any: Vec<Node>,
    functions: Vec<Node>,
    externs: ExternTable,
    storage: StorageLayoutPlanner,
}

impl ProgramAssembler {
    pub fn new(config: PreprocessConfig) -> Self {
        let names = NameGenerator::with_base(config.temp_prefix.clone());
        Self { config, names }
    }

    pub fn with_name_generator(mut self, names: NameGenerator) -> Self {
        self.names = names;
        self
    }

    pub fn config(&self) -> &PreprocessConfig {
        &self.config
    }

    pub fn names(&self) -> &NameGenerator {
        &self.names
    }

    /// Runs the pass over `program`: a `seq` of declarations, or a single
    /// declaration.
    pub fn assemble(&mut self, program: &Node) -> Result<PreprocessResult> {
        let declarations = if program.is_op("seq") {
            program.children()
        } else {
            std::slice::from_ref(program)
        };

        let mut out = Classified::default();
        for declaration in declarations {
            self.classify(declaration, &mut out)?;
        }

        let program = self.build_program(&out, program.span());
        Ok(PreprocessResult {
            program,
            externs: out.externs,
            storage: out.storage.into_table(),
        })
    }

    fn classify(&mut self, declaration: &Node, out: &mut Classified) -> Result<()> {
        match declaration {
            Node::Operation { tag, .. } if tag == "def" => self.classify_def(declaration, out),
            Node::Operation { tag, .. } if tag == "extern" => {
                self.register_extern(declaration, &mut out.externs)
            }
            Node::Operation { tag, children, span } if tag == "data" => {
                let [storage] = children.as_slice() else {
                    return Err(PreprocessError::malformed(
                        format!("data takes one declaration, found {}", children.len()),
                        *span,
                    ));
                };
                out.storage.plan(storage)
            }
            _ => {
                debug!(target: "quill::preprocess", code = %declaration, "collected top-level code");
                out.any.push(declaration.clone());
                Ok(())
            }
        }
    }

    fn classify_def(&mut self, def: &Node, out: &mut Classified) -> Result<()> {
        if let Some(signature) = def.child(0) {
            let name = signature.value();
            if RESERVED_FUNCTIONS.contains(&name) && !signature.children().is_empty() {
                return Err(PreprocessError::malformed(
                    format!("{} cannot have arguments", name),
                    def.span(),
                ));
            }
        }

        let header = FunctionHeader::parse(def)?;
        let name = header.name.as_str();

        match name {
            "init" => {
                if out.init.is_some() {
                    self.collision("init", "init body redefined; last declaration wins");
                }
                out.init = Some(header.body.clone());
            }
            "shared" => {
                if out.shared.is_some() {
                    self.collision("shared", "shared body redefined; last declaration wins");
                }
                out.shared = Some(header.body.clone());
            }
            "any" => out.any.push(header.body.clone()),
            _ => {
                let index = out.functions.len();
                let lowered = FunctionLowering::new(&self.config).lower(&header, index, &mut self.names)?;
                out.functions.push(lowered);
                if let Some(previous) = out.externs.register_function(name, index) {
                    self.collision(
                        name,
                        &format!("function redefined; self.{} now dispatches to {} instead of {}", name, index, previous),
                    );
                }
            }
        }
        Ok(())
    }

    /// `(extern (<any> name (<any> member...)))`; a member is a plain name or
    /// `member:signature`, and its position is its dispatch index.
    fn register_extern(&self, declaration: &Node, externs: &mut ExternTable) -> Result<()> {
        let span = declaration.span();
        let malformed = |what: &str| PreprocessError::malformed(format!("malformed extern: {}", what), span);

        let [interface] = declaration.children() else {
            return Err(malformed("expected a single interface description"));
        };
        let [name, members] = interface.children() else {
            return Err(malformed("expected a name and a member list"));
        };
        let extern_name = name
            .as_token()
            .ok_or_else(|| malformed("extern name must be a plain name"))?;
        if members.is_token() {
            return Err(malformed("member list must be a list"));
        }

        externs.declare_extern(extern_name);
        for (index, member) in members.children().iter().enumerate() {
            let (member_name, signature) = match split_tagged(member)? {
                Some(tagged) => (tagged.name, tagged.tag),
                None => (member.value().to_string(), String::new()),
            };
            if externs.register_member(extern_name, &member_name, index, &signature) {
                self.collision(&member_name, "extern member shadows an earlier one in the global table");
            }
        }

        debug!(
            target: "quill::preprocess",
            extern_name,
            members = members.children().len(),
            "registered extern"
        );
        Ok(())
    }

    fn collision(&self, name: &str, message: &str) {
        if self.config.warn_on_collisions {
            warn!(target: "quill::preprocess", name, "{}", message);
        }
    }

    /// `(seq shared? init? (~return 0 (lll <code> 0)))`
    fn build_program(&self, out: &Classified, span: SourceSpan) -> Node {
        let tok = |text: &str| Node::token(text, span);
        let shared = out.shared.as_ref().filter(|body| is_present(body));
        let init = out.init.as_ref().filter(|body| is_present(body));

        let mut code: Vec<Node> = shared.into_iter().cloned().collect();
        code.extend(out.any.iter().cloned());
        code.extend(out.functions.iter().cloned());
        let code = Node::op("seq", code, span);

        let code = if out.functions.is_empty() {
            code
        } else {
            let selector = Node::op(
                "byte",
                vec![tok("0"), Node::op("calldataload", vec![tok("0")], span)],
                span,
            );
            Node::op(
                "with",
                vec![tok(&self.config.selector_var), selector, code],
                span,
            )
        };

        let mut main: Vec<Node> = shared.into_iter().chain(init).cloned().collect();
        main.push(Node::op(
            "~return",
            vec![tok("0"), Node::op("lll", vec![code, tok("0")], span)],
            span,
        ));
        Node::op("seq", main, span)
    }
}

fn is_present(body: &Node) -> bool {
    !(body.is_op("seq") && body.children().is_empty())
}
